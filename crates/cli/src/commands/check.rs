//! `vnchat check` — Load the story and report what was found.

use std::path::PathBuf;

pub async fn run(dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let (app, context) = super::load_story(dir)?;
    let summary = context.summary();
    let config = context.config();

    println!("vnchat Check — Story Diagnostics");
    println!("================================\n");

    if let Some(dir) = context.source_dir() {
        println!("  Story directory: {}", dir.display());
    }
    println!("  Lore entries:    {}", summary.lore_entries);
    println!("  Character cards: {}", summary.character_cards);
    println!("  Backgrounds:     {}", summary.backgrounds);
    println!("  Music:           {}", summary.music);
    println!("  Scene rows:      {}", summary.scene_rows);
    println!("  Figures:         {}", summary.figures);
    println!("  Model:           {}", config.model.model);
    println!();

    let mut issues = 0;
    let has_story_key = config.model.api_key.as_deref().is_some_and(|k| !k.is_empty());
    if has_story_key || app.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key — set OPENROUTER_API_KEY or API_key in global.json");
        issues += 1;
    }
    if config.prompts.back.is_empty() {
        println!("  ⚠️  back_prompt is empty; some endpoints answer empty without a trailing user message");
        issues += 1;
    }
    if summary.figures == 0 {
        println!("  ⚠️  figure_table is empty; speakers will not resolve");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
