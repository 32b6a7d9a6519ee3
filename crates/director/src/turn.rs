//! One player utterance, end to end.
//!
//! ```text
//! TurnRequest ──▶ prompt ──▶ provider (retry on empty) ──▶ stale check
//!                                                              │
//!            Vec<SceneCommand> ◀── stage ◀── lookups ◀── tags ◀┘
//! ```
//!
//! A turn whose session token went stale while the model was answering is
//! dropped without touching the roster, the memos or the history cursor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vnchat_core::command::SceneCommand;
use vnchat_core::error::Result;
use vnchat_core::provider::{ChatRequest, Provider};
use vnchat_core::session::SessionClock;
use vnchat_core::transcript::TranscriptEntry;
use vnchat_providers::RetryOnEmpty;

use crate::context::StoryContext;
use crate::paginate::TextPaginator;
use crate::prompt::HistoryCompactor;
use crate::stage::DialogueOrchestrator;
use crate::tags::{DirectiveBundle, TagExtractor};

/// Which kinds of command a turn may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFlags {
    pub dialogue: bool,
    pub figure: bool,
    pub background: bool,
    pub music: bool,
    pub scene: bool,
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self {
            dialogue: true,
            figure: true,
            background: true,
            music: true,
            scene: true,
        }
    }
}

/// A player utterance to send to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub id: Uuid,
    pub prompt: String,
    /// Overrides the configured model
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub channels: ChannelFlags,
    /// Wait for the player instead of advancing after the reply
    #[serde(default)]
    pub show_after_point: bool,
}

impl TurnRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            model: None,
            channels: ChannelFlags::default(),
            show_after_point: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Completed {
        reply: String,
        commands: Vec<SceneCommand>,
        auto_advance: bool,
    },
    /// The session changed while the model was answering.
    Stale,
}

pub struct TurnRunner {
    context: StoryContext,
    provider: Arc<dyn Provider>,
    stage: DialogueOrchestrator,
    compactor: HistoryCompactor,
    extractor: TagExtractor,
    paginator: TextPaginator,
    clock: SessionClock,
}

impl TurnRunner {
    pub fn new(context: StoryContext, provider: Arc<dyn Provider>) -> Self {
        let config = context.config();
        Self {
            stage: DialogueOrchestrator::new(config),
            compactor: HistoryCompactor::from_config(config),
            extractor: context.tag_extractor(),
            paginator: context.paginator(),
            clock: SessionClock::new(),
            context,
            provider,
        }
    }

    /// Use a seeded random source for figure slots and poses.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.stage = DialogueOrchestrator::with_seed(self.context.config(), seed);
        self
    }

    /// Share a session clock with the host.
    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn context(&self) -> &StoryContext {
        &self.context
    }

    pub fn stage(&self) -> &DialogueOrchestrator {
        &self.stage
    }

    /// Re-read the story documents. Stage state is kept.
    pub fn reload(&mut self) -> Result<usize> {
        let loaded = self.context.reload()?;
        let config = self.context.config();
        self.stage.reconfigure(config);
        self.compactor = HistoryCompactor::from_config(config);
        self.extractor = self.context.tag_extractor();
        self.paginator = self.context.paginator();
        Ok(loaded)
    }

    pub async fn run(
        &mut self,
        request: &TurnRequest,
        transcript: &[TranscriptEntry],
        current_scene: &str,
    ) -> Result<TurnOutcome> {
        let token = self.clock.token();
        let config = self.context.config();

        let mut compactor = self.compactor.clone();
        let messages = self
            .context
            .build_prompt(&mut compactor, &request.prompt, transcript)?;
        debug!(turn = %request.id, messages = messages.len(), "Prompt built");

        let chat = ChatRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| config.model.model.clone()),
            messages,
            temperature: config.model.temperature,
            max_tokens: Some(config.model.max_tokens),
        };
        let provider = RetryOnEmpty::new(self.provider.clone(), config.model.max_trying_limit);
        let response = provider.complete(chat).await?;

        if !self.clock.is_current(token) {
            warn!(turn = %request.id, "Session changed while waiting for the model, reply dropped");
            return Ok(TurnOutcome::Stale);
        }
        self.compactor = compactor;

        let reply = response.content;
        let commands = self.dispatch(request, &reply, current_scene);
        info!(
            turn = %request.id,
            commands = commands.len(),
            reply_chars = reply.chars().count(),
            "Turn completed"
        );

        Ok(TurnOutcome::Completed {
            reply,
            commands,
            auto_advance: !request.show_after_point,
        })
    }

    fn dispatch(
        &mut self,
        request: &TurnRequest,
        reply: &str,
        current_scene: &str,
    ) -> Vec<SceneCommand> {
        let mut commands = Vec::new();
        self.stage.begin_paragraph();

        let pieces = split_paragraphs(reply, &self.context.config().paragraph_splitter);
        for (index, piece) in pieces.iter().enumerate() {
            let bundle = self.extractor.analyze(piece);
            debug!(index, memory = ?bundle.memory, "Paragraph analysed");
            self.dispatch_paragraph(request, reply, &bundle, current_scene, &mut commands);
        }
        commands
    }

    fn dispatch_paragraph(
        &mut self,
        request: &TurnRequest,
        reply: &str,
        bundle: &DirectiveBundle,
        current_scene: &str,
        commands: &mut Vec<SceneCommand>,
    ) {
        let channels = request.channels;
        let config = self.context.config();
        let tables = self.context.tables();

        let speaker = bundle
            .speakers
            .iter()
            .filter_map(|name| tables.characters.character(name, config.speaker.strict))
            .map(|c| c.speaker.as_str())
            .collect::<Vec<_>>()
            .join(config.speaker.splitter.as_str());

        let mut features = Vec::new();
        let mut default_paths = Vec::new();
        if channels.figure {
            for directive in &bundle.live2d {
                let default_path = tables.characters.default_path(&directive.speaker_key);
                let candidates = tables.characters.features(
                    &directive.speaker_key,
                    &directive.live2d_key,
                    config.live2d.strict,
                );
                let (Some(default_path), Some(candidates)) = (default_path, candidates) else {
                    continue;
                };
                if let Some(feature) = self.stage.choose_feature(candidates) {
                    features.push(feature.clone());
                    default_paths.push(default_path.to_string());
                }
            }
        }

        let background = channels
            .background
            .then(|| {
                bundle
                    .background
                    .as_deref()
                    .and_then(|key| tables.background.lookup(key, config.background.strict))
            })
            .flatten();
        let bgm = channels
            .music
            .then(|| {
                bundle
                    .bgm
                    .as_deref()
                    .and_then(|key| tables.bgm.lookup(key, config.bgm.strict))
            })
            .flatten();
        let scene = channels
            .scene
            .then(|| {
                bundle.scene.as_deref().and_then(|key| {
                    tables.scene.lookup(current_scene, key, config.scene.strict)
                })
            })
            .flatten();
        debug!(
            %speaker,
            figures = ?default_paths,
            ?background,
            ?bgm,
            ?scene,
            "Directives resolved"
        );

        self.stage.begin_sentence();
        if channels.music {
            commands.extend(self.stage.bgm(bgm));
        }
        if channels.background {
            commands.extend(self.stage.background(background));
        }
        for page in self.paginator.paginate(&bundle.cleaned) {
            if channels.figure {
                commands.extend(self.stage.figures(&features, &default_paths));
            }
            if channels.dialogue {
                commands.push(self.stage.say(&speaker, reply, &page));
            }
        }
        if channels.scene {
            commands.extend(self.stage.scene(scene));
        }
    }
}

/// Split a reply into directive paragraphs. Every piece but the last gets
/// the splitter back; blank pieces are dropped.
fn split_paragraphs(reply: &str, splitter: &str) -> Vec<String> {
    if splitter.is_empty() {
        return if reply.trim().is_empty() {
            Vec::new()
        } else {
            vec![reply.to_string()]
        };
    }

    let parts: Vec<&str> = reply.split(splitter).collect();
    let last = parts.len().saturating_sub(1);
    parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.trim().is_empty())
        .map(|(i, part)| {
            if i == last {
                part.to_string()
            } else {
                format!("{part}{splitter}")
            }
        })
        .collect()
}
