//! Per-story director settings.
//!
//! Populated from two JSON documents shipped with the story:
//!
//! - `controls` — directive delimiters, splitters, strict/repeat flags and
//!   stage layout bounds (the lookup tables in the same document are loaded
//!   by the director crate).
//! - `global` — prompt templates and model parameters.
//!
//! Fields absent from a document keep their current value, and so do fields
//! with a value of the wrong type. Boolean flags accept either `true` or the
//! string `"true"`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::ConfigError;

/// Delimiter rule for one directive kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub front: String,
    pub back: String,
    /// Separates list items inside a span (speaker and live2d spans only)
    pub splitter: String,
    /// Exact-key lookups instead of substring lookups
    pub strict: bool,
    /// Emit a command even when the resolved value repeats the previous one
    pub allow_repeat: bool,
}

impl MatchRule {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            splitter: String::new(),
            strict: false,
            allow_repeat: false,
        }
    }

    pub fn with_splitter(mut self, splitter: impl Into<String>) -> Self {
        self.splitter = splitter.into();
        self
    }

    /// A rule with an empty delimiter never matches.
    pub fn is_enabled(&self) -> bool {
        !self.front.is_empty() && !self.back.is_empty()
    }
}

/// System-level prompt fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Sent first, as a system message
    pub front: String,
    /// Output-format constraints, as a system message
    pub format: String,
    /// Sent last, as a user message
    pub back: String,
}

/// Model call parameters.
#[derive(Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Extra attempts after the first when the reply is empty
    pub max_trying_limit: u32,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ModelParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelParams")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_trying_limit", &self.max_trying_limit)
            .field("api_key", &crate::redact(&self.api_key))
            .finish()
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3.7-sonnet".into(),
            temperature: 0.7,
            max_tokens: 10000,
            max_trying_limit: 1,
            api_key: None,
        }
    }
}

/// Horizontal stage bounds for figure placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageLayout {
    pub border_left: f64,
    pub border_right: f64,
    pub character_gap: f64,
    /// Move duration per unit of horizontal distance
    pub position_change_factor: f64,
}

impl Default for StageLayout {
    fn default() -> Self {
        Self {
            border_left: -1300.0,
            border_right: 1300.0,
            character_gap: 600.0,
            position_change_factor: 1.0,
        }
    }
}

/// All per-story settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorConfig {
    pub live2d: MatchRule,
    /// Characters separating `speaker` from `pose` inside a live2d item
    pub speaker_indicators: Vec<char>,
    pub speaker: MatchRule,
    pub background: MatchRule,
    pub bgm: MatchRule,
    pub scene: MatchRule,
    pub memory: MatchRule,

    /// Separates multiple dialogue paragraphs in one reply
    pub paragraph_splitter: String,
    pub sentence_terminators: Vec<char>,
    pub close_punctuation: Vec<char>,
    pub page_max_chars: usize,

    pub prompts: PromptTemplates,
    /// Shown speaker name of the player
    pub user_name: String,
    /// Placeholder line shown while a reply is pending
    pub waiting_info: String,
    pub context_item_length: usize,
    pub lore_search_length: usize,

    pub model: ModelParams,
    pub layout: StageLayout,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            live2d: MatchRule::new("<<<", ">>>").with_splitter("|"),
            speaker_indicators: vec![':', '：'],
            speaker: MatchRule::new("<<<", ">>>").with_splitter("|"),
            background: MatchRule::new("<<<", ">>>"),
            bgm: MatchRule::new("<<<", ">>>"),
            scene: MatchRule::new("<<<", ">>>"),
            memory: MatchRule::new("[[[", "]]]"),
            paragraph_splitter: ">>>".into(),
            sentence_terminators: "。！？.!?\n；;）)】]》>".chars().collect(),
            close_punctuation: "”’》】）])>\"'）」".chars().collect(),
            page_max_chars: 78,
            prompts: PromptTemplates::default(),
            user_name: "你".into(),
            waiting_info: "waiting for AI response...".into(),
            context_item_length: 10,
            lore_search_length: 2,
            model: ModelParams::default(),
            layout: StageLayout::default(),
        }
    }
}

impl DirectorConfig {
    /// Apply the `controls` document.
    pub fn apply_controls(&mut self, raw: &serde_json::Value) -> Result<(), ConfigError> {
        let doc: ControlsDocument = read_document(raw, "controls")?;

        set(&mut self.live2d.front, doc.live2d_front_match);
        set(&mut self.live2d.back, doc.live2d_back_match);
        set(&mut self.live2d.splitter, doc.live2d_spliter);
        set(&mut self.live2d.strict, doc.live2d_use_strict);
        if let Some(indicators) = doc.live2d_speaker_indicator {
            self.speaker_indicators = flatten_chars(indicators);
        }

        set(&mut self.speaker.front, doc.speaker_front_match);
        set(&mut self.speaker.back, doc.speaker_back_match);
        set(&mut self.speaker.splitter, doc.speaker_spliter);
        set(&mut self.speaker.strict, doc.speaker_use_strict);

        set(&mut self.background.front, doc.bg_front_match);
        set(&mut self.background.back, doc.bg_back_match);
        set(&mut self.background.strict, doc.bg_use_strict);
        set(&mut self.background.allow_repeat, doc.bg_allow_repeat);

        set(&mut self.bgm.front, doc.bgm_front_match);
        set(&mut self.bgm.back, doc.bgm_back_match);
        set(&mut self.bgm.strict, doc.bgm_use_strict);
        set(&mut self.bgm.allow_repeat, doc.bgm_allow_repeat);

        set(&mut self.scene.front, doc.scene_front_match);
        set(&mut self.scene.back, doc.scene_back_match);
        set(&mut self.scene.strict, doc.scene_use_strict);
        set(&mut self.scene.allow_repeat, doc.scene_allow_repeat);

        set(&mut self.memory.front, doc.memory_front_match);
        set(&mut self.memory.back, doc.memory_back_match);

        set(&mut self.paragraph_splitter, doc.paragraph_spliter);
        if let Some(terminators) = doc.sentence_spliter {
            self.sentence_terminators = flatten_chars(terminators);
        }
        if let Some(close) = doc.close_punctuation {
            self.close_punctuation = flatten_chars(close);
        }
        set(&mut self.page_max_chars, doc.page_max_chars);

        set(&mut self.layout.border_left, doc.screen_border_left);
        set(&mut self.layout.border_right, doc.screen_border_right);
        set(&mut self.layout.character_gap, doc.standard_character_gap);
        set(
            &mut self.layout.position_change_factor,
            doc.position_change_factor,
        );

        if self.layout.border_right < self.layout.border_left {
            warn!(
                left = self.layout.border_left,
                right = self.layout.border_right,
                "Screen borders are inverted; figures will be laid out right to left"
            );
        }
        debug!(config = ?self, "Controls applied");
        Ok(())
    }

    /// Apply the `global` document.
    pub fn apply_global(&mut self, raw: &serde_json::Value) -> Result<(), ConfigError> {
        let doc: GlobalDocument = read_document(raw, "global")?;

        set(&mut self.prompts.front, doc.front_prompt);
        set(&mut self.prompts.back, doc.back_prompt);
        set(&mut self.prompts.format, doc.format_prompt);
        set(&mut self.model.model, doc.model);
        set(&mut self.model.temperature, doc.temperature);
        set(&mut self.model.max_tokens, doc.max_tokens);
        set(&mut self.user_name, doc.user_name);
        set(&mut self.waiting_info, doc.waiting_info);
        set(&mut self.context_item_length, doc.context_item_length);
        set(&mut self.lore_search_length, doc.lore_search_length);
        set(&mut self.model.max_trying_limit, doc.api_max_trying_limit);
        if let Some(key) = doc.api_key {
            self.model.api_key = Some(key);
        }

        if !self.model.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            warn!(
                "API key is not set in the global document; falling back to the runtime configuration"
            );
        }
        debug!(model = %self.model.model, "Global settings applied");
        Ok(())
    }
}

/// Deserialize a settings document field by field.
///
/// A field whose value has the wrong shape is dropped with a warning; the
/// remaining fields still apply. Only a non-object document is an error.
fn read_document<T: DeserializeOwned>(raw: &Value, document: &str) -> Result<T, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDocument {
        document: document.into(),
        reason,
    };
    let fields = raw
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object".into()))?;

    let mut accepted = Map::new();
    for (key, value) in fields {
        let mut single = Map::new();
        single.insert(key.clone(), value.clone());
        match T::deserialize(&Value::Object(single)) {
            Ok(_) => {
                accepted.insert(key.clone(), value.clone());
            }
            Err(e) => warn!(document, field = %key, error = %e, "Ignoring malformed field"),
        }
    }
    T::deserialize(&Value::Object(accepted)).map_err(|e| invalid(e.to_string()))
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn flatten_chars(items: Vec<String>) -> Vec<char> {
    items.iter().flat_map(|s| s.chars()).collect()
}

/// Accepts `true`/`false` or the strings `"true"`/anything-else.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Text(String),
    }

    Ok(Option::<Repr>::deserialize(deserializer)?.map(|r| match r {
        Repr::Bool(b) => b,
        Repr::Text(s) => s == "true",
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ControlsDocument {
    live2d_front_match: Option<String>,
    live2d_back_match: Option<String>,
    live2d_spliter: Option<String>,
    live2d_speaker_indicator: Option<Vec<String>>,
    #[serde(deserialize_with = "flag")]
    live2d_use_strict: Option<bool>,

    speaker_front_match: Option<String>,
    speaker_back_match: Option<String>,
    speaker_spliter: Option<String>,
    #[serde(deserialize_with = "flag")]
    speaker_use_strict: Option<bool>,

    bg_front_match: Option<String>,
    bg_back_match: Option<String>,
    #[serde(deserialize_with = "flag")]
    bg_use_strict: Option<bool>,
    #[serde(deserialize_with = "flag")]
    bg_allow_repeat: Option<bool>,

    bgm_front_match: Option<String>,
    bgm_back_match: Option<String>,
    #[serde(deserialize_with = "flag")]
    bgm_use_strict: Option<bool>,
    #[serde(deserialize_with = "flag")]
    bgm_allow_repeat: Option<bool>,

    scene_front_match: Option<String>,
    scene_back_match: Option<String>,
    #[serde(deserialize_with = "flag")]
    scene_use_strict: Option<bool>,
    #[serde(deserialize_with = "flag")]
    scene_allow_repeat: Option<bool>,

    memory_front_match: Option<String>,
    memory_back_match: Option<String>,

    paragraph_spliter: Option<String>,
    sentence_spliter: Option<Vec<String>>,
    close_punctuation: Option<Vec<String>>,
    page_max_chars: Option<usize>,

    screen_border_left: Option<f64>,
    screen_border_right: Option<f64>,
    standard_character_gap: Option<f64>,
    position_change_factor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GlobalDocument {
    front_prompt: Option<String>,
    back_prompt: Option<String>,
    format_prompt: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    user_name: Option<String>,
    waiting_info: Option<String>,
    context_item_length: Option<usize>,
    lore_search_length: Option<usize>,
    #[serde(rename = "API_max_trying_limit")]
    api_max_trying_limit: Option<u32>,
    #[serde(rename = "API_key")]
    api_key: Option<String>,
}
