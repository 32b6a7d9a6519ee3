//! Lore activation.
//!
//! Decides which lore entries are injected for one prompt:
//!
//! 1. every enabled constant entry;
//! 2. every enabled non-constant entry whose key occurs in a message of the
//!    search window;
//! 3. recursively, entries whose key occurs in the content of an already
//!    activated entry (unless that entry prevents recursion, or the
//!    candidate excludes itself from recursion).
//!
//! Each entry activates at most once per call. The catalog is only read.

use tracing::{debug, trace};
use vnchat_core::message::PromptMessage;

use crate::catalog::LoreEntry;

pub struct LoreActivationEngine<'a> {
    entries: &'a [LoreEntry],
    processed: Vec<bool>,
    activated: Vec<usize>,
}

impl<'a> LoreActivationEngine<'a> {
    pub fn new(entries: &'a [LoreEntry]) -> Self {
        Self {
            entries,
            processed: vec![false; entries.len()],
            activated: Vec::new(),
        }
    }

    /// Run all three phases over `window` (chronological order).
    pub fn activate(mut self, window: &[PromptMessage]) -> Vec<&'a LoreEntry> {
        self.constant_phase();
        for message in window {
            self.keyword_phase(&message.content);
        }

        let mut queue: Vec<usize> = self
            .activated
            .iter()
            .copied()
            .filter(|&i| !self.entries[i].prevent_recursion)
            .collect();

        let entries = self.entries;
        while let Some(index) = queue.pop() {
            let newly = self.recursive_phase(&entries[index].content);
            queue.extend_from_slice(&newly);
        }

        debug!(
            activated = self.activated.len(),
            total = self.entries.len(),
            "Lore activation finished"
        );
        self.activated.iter().map(|&i| &entries[i]).collect()
    }

    fn constant_phase(&mut self) {
        let entries = self.entries;
        for (i, entry) in entries.iter().enumerate() {
            if !self.processed[i] && entry.enabled && entry.constant {
                self.mark(i);
            }
        }
    }

    fn keyword_phase(&mut self, text: &str) {
        let entries = self.entries;
        for (i, entry) in entries.iter().enumerate() {
            if self.processed[i] || !entry.enabled || entry.constant {
                continue;
            }
            if let Some(key) = entry.matching_key(text) {
                trace!(id = entry.id, key, "Lore keyword hit");
                self.mark(i);
            }
        }
    }

    fn recursive_phase(&mut self, text: &str) -> Vec<usize> {
        let mut newly = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if self.processed[i] || !entry.enabled || entry.exclude_recursion {
                continue;
            }
            if let Some(key) = entry.matching_key(text) {
                trace!(id = entry.id, key, "Lore recursive hit");
                newly.push(i);
            }
        }
        for &i in &newly {
            self.mark(i);
        }
        newly
    }

    fn mark(&mut self, index: usize) {
        self.processed[index] = true;
        self.activated.push(index);
    }
}

/// Convenience wrapper over [`LoreActivationEngine`].
pub fn activate<'a>(entries: &'a [LoreEntry], window: &[PromptMessage]) -> Vec<&'a LoreEntry> {
    LoreActivationEngine::new(entries).activate(window)
}
