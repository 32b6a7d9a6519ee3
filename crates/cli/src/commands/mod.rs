pub mod check;
pub mod onboard;
pub mod prompt;
pub mod turn;

use std::path::{Path, PathBuf};

use vnchat_config::{AppConfig, DirectorConfig};
use vnchat_core::transcript::TranscriptEntry;
use vnchat_director::StoryContext;

/// Load the runtime config and the story documents.
pub(crate) fn load_story(
    dir: Option<PathBuf>,
) -> Result<(AppConfig, StoryContext), Box<dyn std::error::Error>> {
    let app = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let dir = dir.unwrap_or_else(|| app.documents_dir.clone());

    let base = DirectorConfig {
        page_max_chars: app.page_max_chars,
        ..DirectorConfig::default()
    };
    let context = StoryContext::from_dir(base, &dir)
        .map_err(|e| format!("Failed to load story documents from {}: {e}", dir.display()))?;
    Ok((app, context))
}

/// Read a JSON transcript file; no file means an empty transcript.
pub(crate) fn read_transcript(
    path: Option<&Path>,
) -> Result<Vec<TranscriptEntry>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read transcript {}: {e}", path.display()))?;
    let entries = serde_json::from_str(&text)
        .map_err(|e| format!("Transcript {} is not valid: {e}", path.display()))?;
    Ok(entries)
}
