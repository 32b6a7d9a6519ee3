//! `vnchat prompt` — Print the prompt a turn would send.

use std::path::PathBuf;

use vnchat_director::HistoryCompactor;

pub async fn run(
    say: String,
    transcript: Option<PathBuf>,
    dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, context) = super::load_story(dir)?;
    let transcript = super::read_transcript(transcript.as_deref())?;

    let mut compactor = HistoryCompactor::from_config(context.config());
    let messages = context.build_prompt(&mut compactor, &say, &transcript)?;

    println!("{}", serde_json::to_string_pretty(&messages)?);
    Ok(())
}
