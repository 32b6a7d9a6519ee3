//! Prompt assembly.
//!
//! Builds the final message list from the configured prompt fragments, the
//! character descriptions, the history window and the activated lore:
//!
//! ```text
//! front prompt          (system)
//! format prompt         (system)
//! before-char lore      (entry role)
//! character descriptions
//! after-char lore       (entry role)
//! history, with anchored lore inserted `depth` messages from the end
//! player utterance      (user)
//! back prompt           (user)
//! ```
//!
//! # Determinism
//!
//! Lore is ordered by position, then depth (deepest first), then order;
//! the sort is stable so equal entries keep activation order.

use tracing::debug;
use vnchat_core::error::{Error, Result};
use vnchat_core::message::PromptMessage;

use crate::catalog::{LoreEntry, LorePosition};

// ── Types ─────────────────────────────────────────────────────────────────

/// All inputs required to assemble one prompt.
pub struct PromptInput<'a> {
    pub front_prompt: &'a str,
    pub format_prompt: &'a str,
    /// Rendered character descriptions
    pub characters: &'a [PromptMessage],
    /// Compacted transcript, oldest first
    pub history: Vec<PromptMessage>,
    /// Activated lore, in activation order
    pub lore: Vec<&'a LoreEntry>,
    pub utterance: &'a str,
    pub back_prompt: &'a str,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Order lore by (position asc, depth desc, order asc).
pub fn sort_lore(lore: &mut [&LoreEntry]) {
    lore.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| b.depth.cmp(&a.depth))
            .then_with(|| a.order.cmp(&b.order))
    });
}

/// Insert `message` so that exactly `from_back` messages follow it.
pub fn insert_from_back(
    messages: &mut Vec<PromptMessage>,
    message: PromptMessage,
    from_back: usize,
) -> Result<()> {
    let index = messages.len().checked_sub(from_back).ok_or_else(|| {
        Error::Internal(format!(
            "insert position {from_back} from the back is out of range for {} messages",
            messages.len()
        ))
    })?;
    messages.insert(index, message);
    Ok(())
}

pub fn assemble(input: PromptInput<'_>) -> Result<Vec<PromptMessage>> {
    let PromptInput {
        front_prompt,
        format_prompt,
        characters,
        mut history,
        mut lore,
        utterance,
        back_prompt,
    } = input;

    sort_lore(&mut lore);

    for entry in lore.iter().filter(|l| l.position == LorePosition::Anchored) {
        let depth = entry.depth.min(history.len());
        insert_from_back(&mut history, entry.to_message(), depth)?;
    }

    let at = |position: LorePosition| {
        lore.iter()
            .filter(move |l| l.position == position)
            .map(|l| l.to_message())
    };

    let mut messages = Vec::with_capacity(history.len() + characters.len() + lore.len() + 4);
    messages.push(PromptMessage::system(front_prompt));
    messages.push(PromptMessage::system(format_prompt));
    messages.extend(at(LorePosition::BeforeChar));
    messages.extend_from_slice(characters);
    messages.extend(at(LorePosition::AfterChar));
    messages.extend(history);
    messages.push(PromptMessage::user(utterance));
    messages.push(PromptMessage::user(back_prompt));

    debug!(
        messages = messages.len(),
        lore = lore.len(),
        characters = characters.len(),
        "Prompt assembled"
    );
    Ok(messages)
}
