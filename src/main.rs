//! Main entry point for JSON Batch Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use json_batch_translator::cli::commands::{self, Commands};

/// JSON Batch Translator - checkpointed batch translation of JSON string tables
#[derive(Parser, Debug)]
#[command(name = "json-batch-translator", version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML, YAML or JSON); TRANSLATOR_* env vars override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("json_batch_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    match args.command {
        Commands::Translate {
            input,
            output,
            checkpoint,
            glossary,
            batch_size,
        } => {
            commands::handle_translate(args.config.as_deref(), input, output, checkpoint, glossary, batch_size)
                .await?;
        }
        Commands::Filter {
            input,
            clean_output,
            broken_output,
        } => {
            commands::handle_filter(input, clean_output, broken_output).await?;
        }
        Commands::Extract {
            original,
            broken,
            output,
        } => {
            commands::handle_extract(original, broken, output).await?;
        }
        Commands::Merge { source, destination } => {
            commands::handle_merge(source, destination).await?;
        }
        Commands::Sort { input, output } => {
            commands::handle_sort(input, output).await?;
        }
    }

    Ok(())
}
