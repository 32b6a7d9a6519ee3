//! Card catalog — lore entries and character descriptions.
//!
//! Documents come in four shapes, told apart by name and structure:
//!
//! | Shape | Recognised by | Goes to |
//! |---|---|---|
//! | global | name `global` | `DirectorConfig::apply_global` |
//! | controls | name `controls` | `DirectorConfig::apply_controls` + lookup tables |
//! | character card | top-level `data` object | one [`CharacterCard`] + embedded lore |
//! | world book | anything else | one [`LoreEntry`] per `entries` item |

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;
use vnchat_core::message::{PromptMessage, Role};

// ── Types ─────────────────────────────────────────────────────────────────

/// Where an activated lore entry is placed in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LorePosition {
    BeforeChar = 0,
    AfterChar = 1,
    /// Inside the history window, `depth` messages from the end
    Anchored = 4,
}

impl LorePosition {
    fn from_raw(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => LorePosition::Anchored,
            Some(Value::Number(n)) => match n.as_i64() {
                Some(0) => LorePosition::BeforeChar,
                Some(1) => LorePosition::AfterChar,
                Some(4) => LorePosition::Anchored,
                _ => {
                    warn!(position = %n, "Unsupported lore position, using anchored");
                    LorePosition::Anchored
                }
            },
            Some(Value::String(s)) => match s.as_str() {
                "before_char" => LorePosition::BeforeChar,
                "after_char" => LorePosition::AfterChar,
                other => {
                    warn!(position = other, "Unsupported lore position, using anchored");
                    LorePosition::Anchored
                }
            },
            Some(other) => {
                warn!(position = %other, "Unsupported lore position, using anchored");
                LorePosition::Anchored
            }
        }
    }
}

/// A knowledge snippet injected into the prompt when triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct LoreEntry {
    pub uuid: Uuid,
    pub id: i64,
    pub content: String,
    pub keys: Vec<String>,
    pub constant: bool,
    pub enabled: bool,
    pub depth: usize,
    pub order: i64,
    pub position: LorePosition,
    pub exclude_recursion: bool,
    pub prevent_recursion: bool,
    pub role: Role,
    /// Name of the document the entry came from
    pub source: String,
}

impl LoreEntry {
    /// Whether any key occurs in `text`; returns the first such key.
    pub fn matching_key(&self, text: &str) -> Option<&str> {
        self.keys
            .iter()
            .map(String::as_str)
            .find(|k| text.contains(k))
    }

    pub fn to_message(&self) -> PromptMessage {
        PromptMessage::new(self.role, self.content.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterCard {
    pub uuid: Uuid,
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: String,
}

impl CharacterCard {
    /// Description with every `{{char}}` replaced by the card's name.
    pub fn render(&self) -> String {
        self.description.replace("{{char}}", &self.name)
    }
}

/// How a document should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Empty,
    Global,
    Controls,
    CharacterCard,
    WorldBook,
}

impl DocumentKind {
    pub fn classify(name: &str, raw: &Value) -> Self {
        let empty = match raw {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if empty {
            return DocumentKind::Empty;
        }
        match name {
            "global" => DocumentKind::Global,
            "controls" => DocumentKind::Controls,
            _ if raw.get("data").is_some_and(|d| !d.is_null()) => DocumentKind::CharacterCard,
            _ => DocumentKind::WorldBook,
        }
    }
}

// ── Raw document shapes ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKeys {
    Many(Vec<String>),
    One(String),
}

impl From<RawKeys> for Vec<String> {
    fn from(keys: RawKeys) -> Self {
        match keys {
            RawKeys::Many(v) => v,
            RawKeys::One(s) => vec![s],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawExtensions {
    #[serde(default)]
    depth: Option<i64>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLore {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    depth: Option<i64>,
    #[serde(default)]
    extensions: Option<RawExtensions>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    disable: Option<bool>,
    #[serde(default)]
    keys: Option<RawKeys>,
    #[serde(default)]
    key: Option<RawKeys>,
    #[serde(default)]
    order: Option<i64>,
    #[serde(default)]
    position: Option<Value>,
    #[serde(default)]
    exclude_recursion: Option<bool>,
    #[serde(default)]
    prevent_recursion: Option<bool>,
    #[serde(default)]
    role: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawCharacterData {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    extensions: Option<RawExtensions>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn role_from_raw(value: Option<&Value>) -> Role {
    match value.and_then(Value::as_i64) {
        _ if value.is_none_or(Value::is_null) => Role::System,
        Some(0) => Role::System,
        Some(1) => Role::User,
        Some(2) => Role::Assistant,
        _ => {
            warn!(role = ?value, "Unsupported lore role, using system");
            Role::System
        }
    }
}

fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────

/// All lore entries and character cards, in load order.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    lore: Vec<LoreEntry>,
    characters: Vec<CharacterCard>,
}

impl CardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lore(&self) -> &[LoreEntry] {
        &self.lore
    }

    pub fn characters(&self) -> &[CharacterCard] {
        &self.characters
    }

    pub fn clear(&mut self) {
        self.lore.clear();
        self.characters.clear();
    }

    /// Add every entry of a world book. `entries` may be a map or an array.
    pub fn add_world_book(&mut self, source: &str, raw: &Value) {
        let entries: Vec<&Value> = match raw.get("entries") {
            Some(Value::Object(map)) => map.values().collect(),
            Some(Value::Array(items)) => items.iter().collect(),
            _ => {
                warn!(source, "World book has no entries");
                return;
            }
        };
        let before = self.lore.len();
        for entry in entries {
            self.add_lore(source, entry);
        }
        debug!(source, added = self.lore.len() - before, "World book loaded");
    }

    /// Add a character card and its embedded `character_book`, if any.
    pub fn add_character_card(&mut self, source: &str, raw: &Value) {
        let Some(data) = raw.get("data") else {
            warn!(source, "Character card has no data object");
            return;
        };
        self.add_character(source, data);

        if let Some(entries) = data
            .get("character_book")
            .and_then(|b| b.get("entries"))
            .and_then(Value::as_array)
        {
            for entry in entries {
                self.add_lore(source, entry);
            }
        }
        debug!(
            source,
            characters = self.characters.len(),
            lore = self.lore.len(),
            "Character card loaded"
        );
    }

    fn add_character(&mut self, source: &str, data: &Value) {
        let raw = match RawCharacterData::deserialize(data) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source, error = %e, "Malformed character card, skipping");
                return;
            }
        };
        let (Some(name), Some(description)) = (raw.name, raw.description) else {
            warn!(source, "Character card is missing name or description, skipping");
            return;
        };

        let id = raw
            .id
            .filter(|v| !v.is_null())
            .or_else(|| raw.extensions.and_then(|e| e.id).filter(|v| !v.is_null()))
            .map(|v| id_to_string(&v))
            .unwrap_or_else(|| "0".into());

        self.characters.push(CharacterCard {
            uuid: Uuid::new_v4(),
            id,
            name,
            description,
            source: source.to_string(),
        });
    }

    fn add_lore(&mut self, source: &str, entry: &Value) {
        let raw = match RawLore::deserialize(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source, error = %e, "Malformed lore entry, skipping");
                return;
            }
        };

        let keys: Option<Vec<String>> = raw.keys.or(raw.key).map(Into::into);
        let (Some(keys), Some(content)) = (keys, raw.content) else {
            warn!(source, id = ?raw.id, "Lore entry is missing keys or content, skipping");
            return;
        };

        let enabled = match (raw.enabled, raw.disable) {
            (Some(enabled), _) => enabled,
            (None, Some(disable)) => !disable,
            (None, None) => true,
        };

        let depth = raw
            .depth
            .or_else(|| raw.extensions.as_ref().and_then(|e| e.depth))
            .unwrap_or(4)
            .max(0) as usize;

        self.lore.push(LoreEntry {
            uuid: Uuid::new_v4(),
            id: raw.id.as_ref().and_then(Value::as_i64).unwrap_or(0),
            content,
            keys,
            constant: raw.constant.unwrap_or(false),
            enabled,
            depth,
            order: raw.order.unwrap_or(10),
            position: LorePosition::from_raw(raw.position.as_ref()),
            exclude_recursion: raw.exclude_recursion.unwrap_or(false),
            prevent_recursion: raw.prevent_recursion.unwrap_or(false),
            role: role_from_raw(raw.role.as_ref()),
            source: source.to_string(),
        });
    }

    /// Character descriptions as system messages, in load order.
    pub fn character_prompt(&self) -> Vec<PromptMessage> {
        self.characters
            .iter()
            .map(|c| PromptMessage::system(c.render()))
            .collect()
    }
}
