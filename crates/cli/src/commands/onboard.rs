//! `vnchat onboard` — First-time setup.

use vnchat_config::AppConfig;

const STARTER_GLOBAL: &str = r#"{
  "front_prompt": "You are the narrator of an interactive visual novel.",
  "format_prompt": "Begin every line with <<<speaker>>>. Separate lines spoken by different characters with >>>.",
  "back_prompt": "Continue the story.",
  "model": "anthropic/claude-3.7-sonnet",
  "temperature": 0.7,
  "max_tokens": 10000,
  "context_item_length": 10,
  "lore_search_length": 2,
  "API_max_trying_limit": 1
}
"#;

const STARTER_CONTROLS: &str = r#"{
  "bg_table": [],
  "bgm_table": [],
  "scene_table": [],
  "figure_table": []
}
"#;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("vnchat — First-Time Setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let config = if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        AppConfig::load_from(&config_path)?
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        AppConfig::default()
    };

    let story_dir = &config.documents_dir;
    if !story_dir.exists() {
        std::fs::create_dir_all(story_dir)?;
        println!("✅ Created story directory: {}", story_dir.display());
    }
    for (name, body) in [("global.json", STARTER_GLOBAL), ("controls.json", STARTER_CONTROLS)] {
        let path = story_dir.join(name);
        if !path.exists() {
            std::fs::write(&path, body)?;
            println!("✅ Created {}", path.display());
        }
    }

    println!("\n📝 Next steps:");
    println!("   1. Set OPENROUTER_API_KEY or add api_key to {}", config_path.display());
    println!("   2. Fill the tables in {}", story_dir.join("controls.json").display());
    println!("   3. Run: vnchat check\n");

    Ok(())
}
