//! CLI module for SceneSplit
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{DetectArgs, RunArgs};

/// SceneSplit CLI
///
/// Detects shots in videos, slices them into per-shot clips in parallel and
/// consolidates visually redundant neighbours.
#[derive(Parser, Debug)]
#[command(name = "scenesplit")]
#[command(about = "SceneSplit - Shot detection, slicing and clip consolidation")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline over videos or directories of videos
    Run(RunArgs),
    /// Print the locally detected shots of one video
    Detect(DetectArgs),
}
