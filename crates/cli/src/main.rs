//! autoclaw CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config with one example agent
//! - `ask`: Send one message to an agent and print the reply
//! - `run`: Start every agent and chat with one of them on stdin
//! - `state`: Show an agent's persisted internal state and character

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "autoclaw", about = "autoclaw: autonomous LLM agents", version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.autoclaw/config.toml)
    #[arg(short, long, global = true, env = "AUTOCLAW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration if none exists
    Init,

    /// Ask an agent a single question
    Ask {
        /// Agent name
        #[arg(short, long)]
        agent: String,

        /// The message to send
        #[arg(short, long)]
        message: String,
    },

    /// Run every configured agent and chat with one of them
    Run {
        /// Agent receiving stdin messages (defaults to the first one)
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Show an agent's persisted state
    State {
        #[arg(short, long)]
        agent: String,
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

    let config_path = commands::config_path(cli.config.as_deref());
    match cli.command {
        Commands::Init => commands::init::run(&config_path).await?,
        Commands::Ask { agent, message } => {
            let config = commands::load_config(&config_path)?;
            commands::ask::run(&config, &agent, &message).await?
        }
        Commands::Run { agent } => {
            let config = commands::load_config(&config_path)?;
            commands::run::run(&config, agent).await?
        }
        Commands::State { agent } => {
            let config = commands::load_config(&config_path)?;
            commands::state::run(&config, &agent).await?
        }
    }

    Ok(())
}
