//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input video files or directories (searched recursively)
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "SCENESPLIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Analysis mode: auto, local or cloud
    #[arg(long)]
    pub mode: Option<String>,

    /// Videos processed at the same time
    #[arg(long)]
    pub max_videos: Option<usize>,

    /// Parallel cuts per video
    #[arg(long)]
    pub slice_workers: Option<usize>,

    /// Similarity needed to merge neighbours (0-1)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Longest consolidated clip in seconds
    #[arg(long)]
    pub max_merge_duration: Option<f64>,

    /// Skip the merge stage
    #[arg(long)]
    pub no_merge: bool,

    /// Shots shorter than this are folded into their successor (seconds)
    #[arg(long)]
    pub min_shot_duration: Option<f64>,

    /// Scene-change score that starts a new shot (0-1)
    #[arg(long)]
    pub sensitivity: Option<f64>,

    /// Keep every raw boundary: uniform slices, no folding
    #[arg(long)]
    pub preserve_raw_boundaries: bool,

    /// Cloud shot-analysis service base URL
    #[arg(long)]
    pub cloud_endpoint: Option<String>,

    /// Embedding service base URL
    #[arg(long)]
    pub embedding_endpoint: Option<String>,
}

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scene-change score that starts a new shot (0-1)
    #[arg(long)]
    pub sensitivity: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
