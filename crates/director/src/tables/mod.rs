//! Lookup tables loaded from the `controls` document.
//!
//! Every table resolves a key produced by the model to a stored value.
//! Matching is either strict (`stored == target`) or fuzzy (`target`
//! contains `stored`), tried row by row in document order.

pub mod character;
pub mod key_value;
pub mod scene;

pub use character::{CharacterTable, Live2DCharacter, Live2DFeature, Live2DTrigger};
pub use key_value::{KeyValueEntry, KeyValueTable};
pub use scene::{SceneRow, SceneTable};

use tracing::warn;

/// Strict or fuzzy key comparison.
pub(crate) fn key_matches(stored: &str, target: &str, strict: bool) -> bool {
    if strict {
        stored == target
    } else {
        target.contains(stored)
    }
}

/// The four tables carried by the `controls` document.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    pub background: KeyValueTable,
    pub bgm: KeyValueTable,
    pub scene: SceneTable,
    pub characters: CharacterTable,
}

impl LookupTables {
    /// Load every table from `controls`. A missing or malformed table is
    /// logged and left empty; the others still load.
    pub fn load_controls(&mut self, raw: &serde_json::Value) {
        match KeyValueTable::from_controls(raw, "bg_table") {
            Ok(table) => self.background = table,
            Err(reason) => warn!(table = "bg_table", %reason, "Skipping table"),
        }
        match KeyValueTable::from_controls(raw, "bgm_table") {
            Ok(table) => self.bgm = table,
            Err(reason) => warn!(table = "bgm_table", %reason, "Skipping table"),
        }
        match SceneTable::from_controls(raw) {
            Ok(table) => self.scene = table,
            Err(reason) => warn!(table = "scene_table", %reason, "Skipping table"),
        }
        match CharacterTable::from_controls(raw) {
            Ok(table) => self.characters = table,
            Err(reason) => warn!(table = "figure_table", %reason, "Skipping table"),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fuzzy_match_is_substring_of_target() {
        assert!(key_matches("forest", "dark forest at night", false));
        assert!(!key_matches("dark forest", "forest", false));
        assert!(key_matches("forest", "forest", true));
        assert!(!key_matches("forest", "dark forest", true));
    }

    #[test]
    fn broken_table_does_not_block_the_others() {
        let mut tables = LookupTables::default();
        tables.load_controls(&json!({
            "bg_table": "not an array",
            "bgm_table": [{ "key": "battle", "value": "battle.mp3" }]
        }));

        assert!(tables.background.is_empty());
        assert_eq!(tables.bgm.len(), 1);
        assert!(tables.scene.is_empty());
        assert!(tables.characters.is_empty());
    }
}
