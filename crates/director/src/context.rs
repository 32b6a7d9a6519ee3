//! Story context: everything loaded from a story's document directory.
//!
//! A story directory holds JSON documents named by role:
//!
//! - `global.json`: prompts, model parameters, history sizes
//! - `controls.json`: delimiters, layout and the lookup tables
//! - any other file: a character card (has a `data` object) or a world book
//!
//! Documents are read once and stay read-only until [`StoryContext::reload`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use vnchat_config::DirectorConfig;
use vnchat_core::error::Result;
use vnchat_core::message::PromptMessage;
use vnchat_core::transcript::TranscriptEntry;

use crate::catalog::{CardCatalog, DocumentKind};
use crate::paginate::TextPaginator;
use crate::prompt::{HistoryCompactor, PromptInput, activate, assemble};
use crate::tables::LookupTables;
use crate::tags::TagExtractor;

/// Load counts, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub lore_entries: usize,
    pub character_cards: usize,
    pub backgrounds: usize,
    pub music: usize,
    pub scene_rows: usize,
    pub figures: usize,
}

#[derive(Debug, Clone)]
pub struct StoryContext {
    /// Settings before any document was applied; reload starts from here.
    base: DirectorConfig,
    config: DirectorConfig,
    tables: LookupTables,
    catalog: CardCatalog,
    source_dir: Option<PathBuf>,
}

impl StoryContext {
    pub fn new(config: DirectorConfig) -> Self {
        Self {
            base: config.clone(),
            config,
            tables: LookupTables::default(),
            catalog: CardCatalog::new(),
            source_dir: None,
        }
    }

    /// Create a context and load every document in `dir`.
    pub fn from_dir(config: DirectorConfig, dir: impl Into<PathBuf>) -> Result<Self> {
        let mut context = Self::new(config);
        context.load_dir(dir)?;
        Ok(context)
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            lore_entries: self.catalog.lore().len(),
            character_cards: self.catalog.characters().len(),
            backgrounds: self.tables.background.len(),
            music: self.tables.bgm.len(),
            scene_rows: self.tables.scene.len(),
            figures: self.tables.characters.len(),
        }
    }

    pub fn tag_extractor(&self) -> TagExtractor {
        TagExtractor::new(&self.config)
    }

    pub fn paginator(&self) -> TextPaginator {
        TextPaginator::from_config(&self.config)
    }

    /// Interpret one parsed document. `name` is the file stem.
    pub fn load_document(&mut self, name: &str, raw: &Value) {
        match DocumentKind::classify(name, raw) {
            DocumentKind::Empty => {
                error!(document = name, "Document is empty, skipping");
            }
            DocumentKind::Global => {
                if let Err(e) = self.config.apply_global(raw) {
                    warn!(document = name, error = %e, "Global settings not applied");
                }
            }
            DocumentKind::Controls => {
                if let Err(e) = self.config.apply_controls(raw) {
                    warn!(document = name, error = %e, "Control settings not applied");
                }
                self.tables.load_controls(raw);
            }
            DocumentKind::CharacterCard => self.catalog.add_character_card(name, raw),
            DocumentKind::WorldBook => self.catalog.add_world_book(name, raw),
        }
    }

    /// Load every `*.json` file in `dir`. `global` and `controls` go first,
    /// the rest in file-name order. Unreadable or malformed files are
    /// skipped. Returns the number of documents loaded.
    pub fn load_dir(&mut self, dir: impl Into<PathBuf>) -> Result<usize> {
        let dir = dir.into();
        let mut files: Vec<(String, PathBuf)> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();
        files.sort_by(|(a, _), (b, _)| load_rank(a).cmp(&load_rank(b)).then_with(|| a.cmp(b)));

        let mut loaded = 0;
        for (name, path) in &files {
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read document, skipping");
                    continue;
                }
            };
            let raw: Value = match serde_json::from_str(&text) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Document is not valid JSON, skipping");
                    continue;
                }
            };
            self.load_document(name, &raw);
            loaded += 1;
        }

        info!(
            dir = %dir.display(),
            documents = loaded,
            lore = self.catalog.lore().len(),
            characters = self.catalog.characters().len(),
            "Story documents loaded"
        );
        self.source_dir = Some(dir);
        Ok(loaded)
    }

    /// Drop everything loaded and read the source directory again.
    pub fn reload(&mut self) -> Result<usize> {
        self.config = self.base.clone();
        self.tables.clear();
        self.catalog.clear();
        match self.source_dir.clone() {
            Some(dir) => self.load_dir(dir),
            None => {
                debug!("No source directory, context reset to base settings");
                Ok(0)
            }
        }
    }

    /// Assemble the full prompt for `utterance`.
    ///
    /// The lore search window is the last `lore_search_length` history
    /// entries plus the utterance itself; it is built from a copy of the
    /// compactor so both windows start from the same consumed paragraph.
    pub fn build_prompt(
        &self,
        compactor: &mut HistoryCompactor,
        utterance: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<Vec<PromptMessage>> {
        let mut window = compactor
            .clone()
            .recent(transcript, self.config.lore_search_length);
        window.push(PromptMessage::user(utterance));
        let history = compactor.recent(transcript, self.config.context_item_length);

        let lore = activate(self.catalog.lore(), &window);
        let characters = self.catalog.character_prompt();

        assemble(PromptInput {
            front_prompt: &self.config.prompts.front,
            format_prompt: &self.config.prompts.format,
            characters: &characters,
            history,
            lore,
            utterance,
            back_prompt: &self.config.prompts.back,
        })
    }
}

fn load_rank(name: &str) -> u8 {
    match name {
        "global" => 0,
        "controls" => 1,
        _ => 2,
    }
}
