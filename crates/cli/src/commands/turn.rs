//! `vnchat turn` — Run one turn and print the scene commands.

use std::path::PathBuf;
use std::sync::Arc;

use vnchat_director::{TurnRequest, TurnRunner};
use vnchat_providers::OpenAiCompatProvider;

pub struct TurnArgs {
    pub say: String,
    pub transcript: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub scene: String,
    pub model: Option<String>,
    pub seed: Option<u64>,
}

pub async fn run(args: TurnArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (app, context) = super::load_story(args.dir)?;
    let transcript = super::read_transcript(args.transcript.as_deref())?;

    let story_key = context.config().model.api_key.clone();
    let provider = OpenAiCompatProvider::from_config(&app, story_key.as_deref()).map_err(|e| {
        format!(
            "{e}. Set OPENROUTER_API_KEY, add api_key to {}, or set API_key in global.json",
            vnchat_config::AppConfig::config_dir()
                .join("config.toml")
                .display()
        )
    })?;

    let mut runner = TurnRunner::new(context, Arc::new(provider));
    if let Some(seed) = args.seed {
        runner = runner.with_seed(seed);
    }

    let mut request = TurnRequest::new(args.say);
    request.model = args.model;

    let outcome = runner.run(&request, &transcript, &args.scene).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
