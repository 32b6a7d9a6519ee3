//! Transcript (backlog) entries.
//!
//! The host appends one entry per displayed line. The director only reads
//! them to rebuild conversational context.

use serde::{Deserialize, Serialize};

/// A single displayed line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    /// Speaker name as shown on screen
    #[serde(default)]
    pub speaker_name: String,

    /// The text that was shown (one page)
    #[serde(default)]
    pub shown_text: String,

    /// Paragraph id of the AI reply this line came from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_id: Option<String>,

    /// The full AI reply the page was cut from
    #[serde(default)]
    pub full_ai_text: String,
}

impl TranscriptEntry {
    /// A line that did not come from the model.
    pub fn scripted(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_name: speaker.into(),
            shown_text: text.into(),
            paragraph_id: None,
            full_ai_text: String::new(),
        }
    }

    /// A page of an AI reply.
    pub fn generated(
        speaker: impl Into<String>,
        text: impl Into<String>,
        paragraph_id: impl Into<String>,
        full_ai_text: impl Into<String>,
    ) -> Self {
        Self {
            speaker_name: speaker.into(),
            shown_text: text.into(),
            paragraph_id: Some(paragraph_id.into()),
            full_ai_text: full_ai_text.into(),
        }
    }

    /// Paragraph id, treating an empty string as absent.
    pub fn paragraph(&self) -> Option<&str> {
        self.paragraph_id.as_deref().filter(|id| !id.is_empty())
    }
}
