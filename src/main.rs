//! SceneSplit CLI
//!
//! Splits videos into per-shot clips and merges visually redundant neighbours.
//!
//! # Usage
//!
//! ```bash
//! scenesplit run --input ./footage --output ./clips
//! scenesplit run --input a.mp4 b.mov --output ./clips --mode local --no-merge
//! scenesplit detect --input a.mp4 --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use scenesplit_cli::cli::{commands, Cli, Commands};
use scenesplit_cli::utils::logging::{init_logging, LogFormat};

/// Main entry point for the SceneSplit CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Pretty };
    init_logging(&cli.log_level, format)?;
    info!("Starting SceneSplit");

    match cli.command {
        Commands::Run(args) => commands::run(args).await,
        Commands::Detect(args) => commands::detect(args).await,
    }
}
