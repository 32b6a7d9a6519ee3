//! Transcript compaction.
//!
//! Turns the display log into prompt messages. A model reply is shown as
//! several pages; every page carries the reply's paragraph id and full text,
//! so only the first page met (scanning newest to oldest) is kept and the
//! rest are skipped by id.

use tracing::trace;
use vnchat_config::DirectorConfig;
use vnchat_core::message::PromptMessage;
use vnchat_core::transcript::TranscriptEntry;

/// Speaker name used by the host for debug output.
pub const DEBUG_SPEAKER: &str = "debuggerInfo";

#[derive(Debug, Clone)]
pub struct HistoryCompactor {
    user_name: String,
    waiting_info: String,
    /// Paragraph id of the most recently decoded AI reply
    last_decoded: Option<String>,
}

impl HistoryCompactor {
    pub fn new(user_name: impl Into<String>, waiting_info: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            waiting_info: waiting_info.into(),
            last_decoded: None,
        }
    }

    pub fn from_config(config: &DirectorConfig) -> Self {
        Self::new(config.user_name.clone(), config.waiting_info.clone())
    }

    /// The last `n` qualifying entries of `transcript`, oldest first.
    pub fn recent(&mut self, transcript: &[TranscriptEntry], n: usize) -> Vec<PromptMessage> {
        let mut collected = Vec::with_capacity(n);
        if n == 0 {
            return collected;
        }

        for entry in transcript.iter().rev() {
            if !self.qualifies(entry) {
                continue;
            }
            collected.push(self.decode(entry));
            if collected.len() >= n {
                break;
            }
        }

        collected.reverse();
        trace!(count = collected.len(), requested = n, "History window built");
        collected
    }

    fn qualifies(&self, entry: &TranscriptEntry) -> bool {
        if entry.paragraph().is_some() && entry.paragraph() == self.last_decoded.as_deref() {
            return false;
        }
        !(entry.shown_text.is_empty()
            || entry.shown_text == self.waiting_info
            || entry.speaker_name == DEBUG_SPEAKER)
    }

    fn decode(&mut self, entry: &TranscriptEntry) -> PromptMessage {
        if entry.speaker_name == self.user_name {
            return PromptMessage::user(entry.shown_text.clone());
        }
        if let Some(id) = entry.paragraph() {
            self.last_decoded = Some(id.to_string());
            return PromptMessage::assistant(entry.full_ai_text.clone());
        }
        PromptMessage::system(format!("{}:{}", entry.speaker_name, entry.shown_text))
    }
}
