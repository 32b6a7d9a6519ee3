//! Scene transition table.
//!
//! ```json
//! "scene_table": [
//!   { "classroom": { "go home": "home.txt", "rooftop": "roof.txt" } },
//!   { "home": { "sleep": "ending.txt" } }
//! ]
//! ```

use tracing::{debug, warn};

use super::key_matches;
use super::key_value::KeyValueEntry;

/// Triggers available while the story is in `scene`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRow {
    pub scene: String,
    pub triggers: Vec<KeyValueEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneTable {
    rows: Vec<SceneRow>,
}

impl SceneTable {
    pub fn new(rows: Vec<SceneRow>) -> Self {
        Self { rows }
    }

    pub(crate) fn from_controls(raw: &serde_json::Value) -> Result<Self, String> {
        let items = raw
            .get("scene_table")
            .ok_or("missing scene_table in controls")?
            .as_array()
            .ok_or("scene_table is not an array")?;

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let Some((scene, triggers)) = item.as_object().and_then(|o| o.iter().next()) else {
                warn!(?item, "Empty current-scene row in scene_table, skipping");
                continue;
            };
            let Some(triggers) = triggers.as_object() else {
                warn!(scene = %scene, "Scene triggers must be an object, skipping row");
                continue;
            };
            let triggers = triggers
                .iter()
                .map(|(key, value)| KeyValueEntry {
                    key: key.clone(),
                    value: value.as_str().unwrap_or_default().to_string(),
                })
                .collect();
            rows.push(SceneRow {
                scene: scene.clone(),
                triggers,
            });
        }

        debug!(rows = rows.len(), "Scene table loaded");
        Ok(Self { rows })
    }

    /// Resolve a transition from `current_scene` for `target`.
    ///
    /// Only the first row whose scene matches is searched.
    pub fn lookup(&self, current_scene: &str, target: &str, strict: bool) -> Option<&str> {
        let Some(row) = self
            .rows
            .iter()
            .find(|row| key_matches(&row.scene, current_scene, strict))
        else {
            warn!(current_scene, "Current scene not found in scene_table");
            return None;
        };

        let found = row
            .triggers
            .iter()
            .find(|t| key_matches(&t.key, target, strict) && !t.value.is_empty())
            .map(|t| t.value.as_str());

        if found.is_none() {
            warn!(scene = %row.scene, target, "No matching scene trigger or value is empty");
        }
        found
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
