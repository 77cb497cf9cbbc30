//! FFprobe adapter for media file probing
//!
//! Reads the container duration through `ffprobe -show_entries format=duration`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapters::exec_ffmpeg::run_tool;
use crate::domain::errors::*;
use crate::ports::*;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Pull a positive duration out of ffprobe's JSON output
pub fn parse_duration_json(output: &[u8]) -> Result<f64, DomainError> {
    let parsed: ProbeOutput = serde_json::from_slice(output)
        .map_err(|e| DomainError::InvalidResponse(format!("ffprobe output is not JSON: {}", e)))?;

    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| DomainError::InvalidResponse("ffprobe reported no duration".to_string()))?;

    match raw.trim().parse::<f64>() {
        Ok(duration) if duration.is_finite() && duration > 0.0 => Ok(duration),
        _ => Err(DomainError::InvalidResponse(format!("Unusable duration '{}'", raw))),
    }
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    binary: String,
    timeout: Duration,
}

impl FfprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn args(file_path: &Path) -> Vec<String> {
        vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "json".into(),
            file_path.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe_duration(&self, file_path: &Path) -> Result<f64, DomainError> {
        if !file_path.is_file() {
            return Err(DomainError::FileNotFound(file_path.display().to_string()));
        }
        let stdout = run_tool(&self.binary, &Self::args(file_path), self.timeout).await?;
        parse_duration_json(&stdout)
    }
}
