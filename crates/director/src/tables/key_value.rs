//! Flat `{key, value}` tables (backgrounds, music).

use serde::Deserialize;
use tracing::{debug, warn};

use super::key_matches;

/// A single table row. An empty `value` never resolves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyValueEntry {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// An ordered key → value table.
#[derive(Debug, Clone, Default)]
pub struct KeyValueTable {
    name: String,
    rows: Vec<KeyValueEntry>,
}

impl KeyValueTable {
    pub fn new(name: impl Into<String>, rows: Vec<KeyValueEntry>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Read the array stored under `field` in the `controls` document.
    pub(crate) fn from_controls(raw: &serde_json::Value, field: &str) -> Result<Self, String> {
        let value = raw
            .get(field)
            .ok_or_else(|| format!("missing {field} in controls"))?;
        let rows: Vec<KeyValueEntry> =
            serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        debug!(table = field, rows = rows.len(), "Table loaded");
        Ok(Self::new(field, rows))
    }

    /// Resolve `target` to the first row whose key matches and whose value
    /// is non-empty.
    pub fn lookup(&self, target: &str, strict: bool) -> Option<&str> {
        let found = self
            .rows
            .iter()
            .find(|row| key_matches(&row.key, target, strict) && !row.value.is_empty())
            .map(|row| row.value.as_str());

        if found.is_none() {
            warn!(table = %self.name, target, strict, "No matching key or value is empty");
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
