//! SceneSplit CLI Library
//!
//! Shot boundary detection, parallel per-shot slicing and similarity-based
//! consolidation of adjacent clips, driven over the ffmpeg command-line tools.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use adapters::toml_config::PipelineOptions;
pub use domain::errors::DomainError;
pub use domain::model::{Clip, RunReport, ShotInterval, VideoResult};
pub use error::{SceneSplitError, SceneSplitResult};
