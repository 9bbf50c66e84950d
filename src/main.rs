mod app;
mod assistants;
mod commands;
mod config;
mod llm;
mod message;
mod negotiation;
mod prompts;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gemchat - a terminal front-end for Google Gemini chat assistants
#[derive(Parser, Debug)]
#[command(name = "gemchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the assistant definitions JSON file
    #[arg(short, long)]
    assistants: Option<PathBuf>,

    /// Model to preselect (resource name, e.g. models/gemini-1.5-flash-002)
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the two-agent negotiation demo
    Negotiate {
        /// Model both research agents run on
        #[arg(short, long, default_value = "models/gemini-2.0-flash-001")]
        model: String,

        /// Rounds allowed before the supervisor gives up
        #[arg(long, default_value_t = negotiation::DEFAULT_MAX_ROUNDS)]
        max_rounds: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log to a file so the chat surface stays clean
    let log_file = std::fs::File::create("/tmp/gemchat.log")?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(log_file).with_ansi(false))
        .init();

    // Load .env files (local first, then home directory)
    // Errors are ignored - files are optional
    let _ = dotenvy::from_filename(".env");
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".env"));
    }

    let args = Args::parse();

    // Load configuration
    let mut config = config::Config::load()?;

    // Apply CLI overrides
    if let Some(assistants) = args.assistants {
        config.general.assistants_path = assistants;
    }
    if let Some(model) = args.model {
        config.defaults.model = model;
    }

    match args.command {
        Some(Commands::Negotiate { model, max_rounds }) => {
            app::run_negotiation(config, model, max_rounds).await
        }
        None => {
            let mut app = app::App::new(config).await?;
            app.run().await
        }
    }
}
