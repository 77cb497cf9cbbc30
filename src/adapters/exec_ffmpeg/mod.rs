//! FFmpeg execution adapter
//!
//! Drives the `ffmpeg` command-line tool for scene scoring, cutting and frame grabs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Edge length of the square frames handed to feature extraction
pub const ANALYSIS_FRAME_SIZE: u32 = 64;

/// Run an external tool to completion and return its stdout.
///
/// The child is killed when the timeout elapses.
pub async fn run_tool(binary: &str, args: &[String], timeout: Duration) -> Result<Vec<u8>, DomainError> {
    let program = which::which(binary).map_err(|_| DomainError::ToolNotFound(binary.to_string()))?;
    debug!("Running {} {}", binary, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DomainError::tool_failed(binary, format!("spawn failed: {}", e), None))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| DomainError::tool_failed(binary, e.to_string(), None))?,
        Err(_) => {
            return Err(DomainError::Timeout {
                operation: binary.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    };

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DomainError::tool_failed(
            binary,
            stderr.lines().last().unwrap_or("exited with non-zero status").trim(),
            output.status.code(),
        ))
    }
}

/// Builder for FFmpeg argument lists
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: String,
    input_args: Vec<String>,
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl Into<String>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// Input seek (before -i)
    pub fn seek(mut self, seconds: f64) -> Self {
        self.input_args.push("-ss".into());
        self.input_args.push(format!("{:.3}", seconds.max(0.0)));
        self
    }

    /// Output duration limit
    pub fn duration(mut self, seconds: f64) -> Self {
        self.output_args.push("-t".into());
        self.output_args.push(format!("{:.3}", seconds));
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-hide_banner".into(), "-nostats".into(), "-v".into(), "error".into()];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".into());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.clone());
        args
    }
}

/// Encoder settings for re-encoded cuts
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub preset: String,
    pub crf: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            preset: "fast".to_string(),
            crf: 23,
        }
    }
}

/// FFmpeg-based execution adapter
pub struct FfmpegExecAdapter {
    binary: String,
    timeout: Duration,
    encode: EncodeSettings,
}

impl FfmpegExecAdapter {
    /// Create new FFmpeg adapter
    pub fn new(binary: impl Into<String>, timeout: Duration, encode: EncodeSettings) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            encode,
        }
    }

    pub fn scene_score_command(file_path: &Path) -> FfmpegCommand {
        FfmpegCommand::new(file_path, "-").output_args([
            "-an",
            "-sn",
            "-vf",
            "select='gte(scene,0)',metadata=print:file=-",
            "-f",
            "null",
        ])
    }

    pub fn cut_command(request: &CutRequest, encode: &EncodeSettings) -> FfmpegCommand {
        let command = FfmpegCommand::new(&request.source, request.output.to_string_lossy().to_string())
            .seek(request.start)
            .duration(request.duration);

        match request.mode {
            CutMode::StreamCopy => command.output_args(["-c", "copy", "-avoid_negative_ts", "make_zero"]),
            CutMode::ReEncode => command
                .output_args(["-c:v", "libx264", "-preset"])
                .output_arg(encode.preset.clone())
                .output_arg("-crf")
                .output_arg(encode.crf.to_string())
                .output_args(["-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart"]),
        }
    }

    pub fn frame_command(file_path: &Path, timestamp: f64) -> FfmpegCommand {
        FfmpegCommand::new(file_path, "-")
            .seek(timestamp)
            .output_args(["-frames:v", "1", "-vf"])
            .output_arg(format!("scale={0}:{0}", ANALYSIS_FRAME_SIZE))
            .output_args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
    }

    fn ensure_input(file_path: &Path) -> Result<(), DomainError> {
        if file_path.is_file() {
            Ok(())
        } else {
            Err(DomainError::FileNotFound(file_path.display().to_string()))
        }
    }
}

/// Parse `metadata=print` output into (pts_time, scene_score) samples
pub fn parse_scene_scores(output: &str) -> Vec<SceneScore> {
    let mut scores = Vec::new();
    let mut current_time: Option<f64> = None;

    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("frame:") {
            current_time = line
                .split_whitespace()
                .find_map(|token| token.strip_prefix("pts_time:"))
                .and_then(|value| value.parse::<f64>().ok());
        } else if let Some(value) = line.strip_prefix("lavfi.scene_score=") {
            if let (Some(time), Ok(score)) = (current_time, value.parse::<f64>()) {
                scores.push(SceneScore { time, score });
            }
        }
    }

    scores
}

#[async_trait]
impl ExecutePort for FfmpegExecAdapter {
    async fn scene_scores(&self, file_path: &Path) -> Result<Vec<SceneScore>, DomainError> {
        Self::ensure_input(file_path)?;
        let args = Self::scene_score_command(file_path).build_args();
        let stdout = run_tool(&self.binary, &args, self.timeout).await?;
        let scores = parse_scene_scores(&String::from_utf8_lossy(&stdout));
        debug!(samples = scores.len(), "Scene scores collected for {}", file_path.display());
        Ok(scores)
    }

    async fn cut_segment(&self, request: &CutRequest) -> Result<(), DomainError> {
        Self::ensure_input(&request.source)?;
        if request.duration <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Cut duration must be positive, got {:.3}",
                request.duration
            )));
        }
        let args = Self::cut_command(request, &self.encode).build_args();
        run_tool(&self.binary, &args, self.timeout).await?;
        Ok(())
    }

    async fn extract_frames(&self, file_path: &Path, timestamps: &[f64]) -> Result<Vec<Frame>, DomainError> {
        Self::ensure_input(file_path)?;
        let expected = (ANALYSIS_FRAME_SIZE * ANALYSIS_FRAME_SIZE * 3) as usize;
        let mut frames = Vec::with_capacity(timestamps.len());

        for &timestamp in timestamps {
            let args = Self::frame_command(file_path, timestamp).build_args();
            let stdout = run_tool(&self.binary, &args, self.timeout).await?;
            if stdout.len() < expected {
                debug!(timestamp, bytes = stdout.len(), "Short frame read, skipping");
                continue;
            }
            frames.push(Frame::new(
                ANALYSIS_FRAME_SIZE,
                ANALYSIS_FRAME_SIZE,
                stdout[..expected].to_vec(),
            )?);
        }

        if frames.is_empty() {
            return Err(DomainError::ProcessingError(format!(
                "No frames decoded from {}",
                file_path.display()
            )));
        }
        Ok(frames)
    }
}
