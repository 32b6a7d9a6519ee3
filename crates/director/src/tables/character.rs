//! Character (Live2D figure) table.
//!
//! ```json
//! "figure_table": [{
//!   "speaker": "Alice",
//!   "default_live2d_path": "alice/model.json",
//!   "refer_table": {
//!     "smile": [{ "motion": "happy", "expression": "smile" }],
//!     "angry": [{ "motion": "stomp", "expression": "angry", "path": "alice/angry.json" }]
//!   }
//! }]
//! ```

use serde::Deserialize;
use tracing::{debug, warn};

use super::key_matches;

/// One pose a figure can take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Live2DFeature {
    #[serde(default)]
    pub motion: String,
    #[serde(default)]
    pub expression: String,
    /// Model file to load instead of the character's default path
    #[serde(default, rename = "path")]
    pub override_path: String,
}

/// A pose key and the features it may pick from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Live2DTrigger {
    pub key: String,
    pub features: Vec<Live2DFeature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Live2DCharacter {
    pub speaker: String,
    pub default_path: String,
    pub triggers: Vec<Live2DTrigger>,
}

#[derive(Debug, Deserialize)]
struct RawCharacter {
    speaker: String,
    #[serde(default)]
    default_live2d_path: String,
    #[serde(default)]
    refer_table: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct CharacterTable {
    characters: Vec<Live2DCharacter>,
}

impl CharacterTable {
    pub fn new(characters: Vec<Live2DCharacter>) -> Self {
        Self { characters }
    }

    pub(crate) fn from_controls(raw: &serde_json::Value) -> Result<Self, String> {
        let value = raw
            .get("figure_table")
            .ok_or("missing figure_table in controls")?;
        let rows: Vec<RawCharacter> =
            serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;

        let characters = rows
            .into_iter()
            .map(|raw| {
                let triggers: Vec<Live2DTrigger> = raw
                    .refer_table
                    .into_iter()
                    .map(|(key, features)| {
                        let features = serde_json::from_value(features).unwrap_or_else(|e| {
                            warn!(speaker = %raw.speaker, key = %key, error = %e, "Malformed feature list");
                            Vec::new()
                        });
                        Live2DTrigger { key, features }
                    })
                    .collect();
                if triggers.is_empty() {
                    warn!(speaker = %raw.speaker, "Character added with an empty refer_table");
                }
                Live2DCharacter {
                    speaker: raw.speaker,
                    default_path: raw.default_live2d_path,
                    triggers,
                }
            })
            .collect::<Vec<_>>();

        debug!(characters = characters.len(), "Figure table loaded");
        Ok(Self { characters })
    }

    /// Find the first character whose speaker name matches `name`.
    pub fn character(&self, name: &str, strict: bool) -> Option<&Live2DCharacter> {
        let found = self
            .characters
            .iter()
            .find(|c| key_matches(&c.speaker, name, strict));
        if found.is_none() {
            warn!(name, strict, "Unknown speaker");
        }
        found
    }

    /// Features for `key` on the character matching `name`.
    ///
    /// Triggers with no features never match.
    pub fn features(&self, name: &str, key: &str, strict: bool) -> Option<&[Live2DFeature]> {
        let character = self.character(name, strict)?;
        let found = character
            .triggers
            .iter()
            .find(|t| key_matches(&t.key, key, strict) && !t.features.is_empty())
            .map(|t| t.features.as_slice());
        if found.is_none() {
            warn!(speaker = %character.speaker, key, "No matching pose key");
        }
        found
    }

    /// The default model path of the character matching `name` (fuzzy).
    pub fn default_path(&self, name: &str) -> Option<&str> {
        self.character(name, false)
            .map(|c| c.default_path.as_str())
            .filter(|p| !p.is_empty())
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}
