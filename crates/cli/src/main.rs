//! vnchat CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a starter config and story directory
//! - `check`   — Load the story documents and report what was found
//! - `prompt`  — Print the prompt a turn would send, without calling the model
//! - `turn`    — Run one turn and print the scene commands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vnchat",
    about = "vnchat — AI dialogue director for visual novels",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and starter story documents
    Onboard,

    /// Load story documents and print a summary
    Check {
        /// Story directory (defaults to documents_dir from the config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Print the assembled prompt as JSON
    Prompt {
        /// What the player says
        #[arg(short, long)]
        say: String,

        /// JSON transcript of previously shown lines
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Story directory (defaults to documents_dir from the config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Run one turn against the model and print the command stream
    Turn {
        /// What the player says
        #[arg(short, long)]
        say: String,

        /// JSON transcript of previously shown lines
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Story directory (defaults to documents_dir from the config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Name of the scene currently playing
        #[arg(long, default_value = "")]
        scene: String,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,

        /// Seed for figure placement and pose choice
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Check { dir } => commands::check::run(dir).await?,
        Commands::Prompt {
            say,
            transcript,
            dir,
        } => commands::prompt::run(say, transcript, dir).await?,
        Commands::Turn {
            say,
            transcript,
            dir,
            scene,
            model,
            seed,
        } => {
            commands::turn::run(commands::turn::TurnArgs {
                say,
                transcript,
                dir,
                scene,
                model,
                seed,
            })
            .await?
        }
    }

    Ok(())
}
