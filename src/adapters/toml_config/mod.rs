// TOML config adapter - Pipeline options loaded from TOML files and the environment

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::exec_ffmpeg::EncodeSettings;
use crate::domain::model::AnalysisMode;
use crate::domain::rules::{GroupingLimits, ValidationPolicy, RAW_BOUNDARY_MIN_SHOT_DURATION};
use crate::error::{SceneSplitError, SceneSplitResult};
use crate::utils::retry::RetryPolicy;

/// Files probed, in order, when no config path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["scenesplit.toml", "config/scenesplit.toml"];

/// Shot detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOptions {
    /// Scene-score threshold above which a frame starts a new shot
    pub sensitivity: f64,
    pub min_shot_duration: f64,
    /// Keep every raw boundary: uniform segmentation, no short-scene folding
    pub preserve_raw_boundaries: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            sensitivity: 0.3,
            min_shot_duration: 2.0,
            preserve_raw_boundaries: false,
        }
    }
}

impl DetectionOptions {
    /// Explicit switch, or a legacy minimum at or below the raw-boundary value
    pub fn raw_boundaries(&self) -> bool {
        self.preserve_raw_boundaries || self.min_shot_duration <= RAW_BOUNDARY_MIN_SHOT_DURATION
    }
}

/// Similarity merge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub enabled: bool,
    pub similarity_threshold: f32,
    pub max_merge_duration: f64,
    pub max_group_size: usize,
    /// Largest gap a merge run may bridge
    pub continuity_gap: f64,
    /// Pairs further apart than this are never compared
    pub comparison_gap: f64,
    pub frames_per_clip: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        let limits = GroupingLimits::default();
        Self {
            enabled: true,
            similarity_threshold: limits.similarity_threshold,
            max_merge_duration: limits.max_merge_duration,
            max_group_size: limits.max_group_size,
            continuity_gap: limits.continuity_gap,
            comparison_gap: 2.0,
            frames_per_clip: 5,
        }
    }
}

impl MergeOptions {
    pub fn limits(&self) -> GroupingLimits {
        GroupingLimits {
            similarity_threshold: self.similarity_threshold,
            max_merge_duration: self.max_merge_duration,
            max_group_size: self.max_group_size,
            continuity_gap: self.continuity_gap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub min_success_rate: f64,
    pub min_file_size: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        let policy = ValidationPolicy::default();
        Self {
            min_success_rate: policy.min_success_rate,
            min_file_size: policy.min_file_size,
        }
    }
}

impl ValidationOptions {
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            min_success_rate: self.min_success_rate,
            min_file_size: self.min_file_size,
        }
    }
}

/// Worker pool widths for the two concurrency levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyOptions {
    pub max_concurrent_videos: usize,
    pub slice_workers: usize,
}

impl Default for ConcurrencyOptions {
    fn default() -> Self {
        Self {
            max_concurrent_videos: 2,
            slice_workers: num_cpus::get().clamp(1, 4),
        }
    }
}

/// Per-call timeouts in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutOptions {
    pub toolkit_secs: u64,
    pub cloud_secs: u64,
    pub embedding_secs: u64,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            toolkit_secs: 300,
            cloud_secs: 120,
            embedding_secs: 30,
        }
    }
}

impl TimeoutOptions {
    pub fn toolkit(&self) -> Duration {
        Duration::from_secs(self.toolkit_secs)
    }

    pub fn cloud(&self) -> Duration {
        Duration::from_secs(self.cloud_secs)
    }

    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            jitter: policy.jitter,
        }
    }
}

impl RetryOptions {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.jitter,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudOptions {
    pub endpoint: Option<String>,
    /// Feature names forwarded to the analyzer
    pub features: Vec<String>,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            features: vec!["shots".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingOptions {
    pub endpoint: Option<String>,
}

/// Media toolkit binaries and encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitOptions {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for ToolkitOptions {
    fn default() -> Self {
        let encode = EncodeSettings::default();
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            preset: encode.preset,
            crf: encode.crf,
        }
    }
}

impl ToolkitOptions {
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            preset: self.preset.clone(),
            crf: self.crf,
        }
    }
}

/// Complete options bundle handed to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub analysis_mode: AnalysisMode,
    pub detection: DetectionOptions,
    pub merge: MergeOptions,
    pub validation: ValidationOptions,
    pub concurrency: ConcurrencyOptions,
    pub timeouts: TimeoutOptions,
    pub retry: RetryOptions,
    pub cloud: CloudOptions,
    pub embedding: EmbeddingOptions,
    pub toolkit: ToolkitOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            analysis_mode: AnalysisMode::default(),
            detection: DetectionOptions::default(),
            merge: MergeOptions::default(),
            validation: ValidationOptions::default(),
            concurrency: ConcurrencyOptions::default(),
            timeouts: TimeoutOptions::default(),
            retry: RetryOptions::default(),
            cloud: CloudOptions::default(),
            embedding: EmbeddingOptions::default(),
            toolkit: ToolkitOptions::default(),
        }
    }
}

impl PipelineOptions {
    /// Parse options from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> SceneSplitResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> SceneSplitResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SceneSplitError::ConfigError {
            message: format!("Cannot read config file {}: {}", path.display(), e),
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Explicit file if given, else the first default location that exists, else defaults
    pub fn discover(explicit: Option<&Path>) -> SceneSplitResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.is_file() {
                return Self::load(path);
            }
        }
        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply `SCENESPLIT_*` environment overrides; returns how many were applied
    pub fn apply_env(&mut self) -> SceneSplitResult<usize> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> SceneSplitResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let mut take = |key: &str| {
            let value = lookup(key);
            if let Some(v) = &value {
                info!("Found environment override: {} = {}", key, v);
                applied += 1;
            }
            value
        };

        if let Some(v) = take("SCENESPLIT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = take("SCENESPLIT_MODE") {
            self.analysis_mode = AnalysisMode::parse(&v)?;
        }
        if let Some(v) = take("SCENESPLIT_SENSITIVITY") {
            self.detection.sensitivity = parse_env("SCENESPLIT_SENSITIVITY", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_MIN_SHOT_DURATION") {
            self.detection.min_shot_duration = parse_env("SCENESPLIT_MIN_SHOT_DURATION", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_MERGE") {
            self.merge.enabled = parse_env("SCENESPLIT_MERGE", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_SIMILARITY_THRESHOLD") {
            self.merge.similarity_threshold = parse_env("SCENESPLIT_SIMILARITY_THRESHOLD", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_MAX_MERGE_DURATION") {
            self.merge.max_merge_duration = parse_env("SCENESPLIT_MAX_MERGE_DURATION", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_MAX_VIDEOS") {
            self.concurrency.max_concurrent_videos = parse_env("SCENESPLIT_MAX_VIDEOS", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_SLICE_WORKERS") {
            self.concurrency.slice_workers = parse_env("SCENESPLIT_SLICE_WORKERS", &v)?;
        }
        if let Some(v) = take("SCENESPLIT_CLOUD_ENDPOINT") {
            self.cloud.endpoint = Some(v);
        }
        if let Some(v) = take("SCENESPLIT_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = Some(v);
        }
        if let Some(v) = take("SCENESPLIT_FFMPEG") {
            self.toolkit.ffmpeg = v;
        }
        if let Some(v) = take("SCENESPLIT_FFPROBE") {
            self.toolkit.ffprobe = v;
        }

        if applied > 0 {
            info!("Applied {} environment variable overrides", applied);
        }
        Ok(applied)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> SceneSplitResult<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(config_error(format!("{} must be within [0, 1], got {}", name, value)))
            }
        };
        unit("detection.sensitivity", self.detection.sensitivity)?;
        unit("merge.similarity_threshold", f64::from(self.merge.similarity_threshold))?;
        unit("validation.min_success_rate", self.validation.min_success_rate)?;
        unit("retry.jitter", self.retry.jitter)?;

        if !(self.detection.min_shot_duration >= 0.0) {
            return Err(config_error("detection.min_shot_duration must not be negative"));
        }
        if !(self.merge.max_merge_duration > 0.0) {
            return Err(config_error("merge.max_merge_duration must be positive"));
        }
        if !(self.merge.continuity_gap >= 0.0) || self.merge.comparison_gap < self.merge.continuity_gap {
            return Err(config_error(
                "merge.continuity_gap must be non-negative and no larger than merge.comparison_gap",
            ));
        }
        if self.merge.max_group_size == 0 || self.merge.frames_per_clip == 0 {
            return Err(config_error("merge.max_group_size and merge.frames_per_clip must be at least 1"));
        }
        if self.concurrency.max_concurrent_videos == 0 || self.concurrency.slice_workers == 0 {
            return Err(config_error("Worker pool widths must be at least 1"));
        }
        if self.timeouts.toolkit_secs == 0 || self.timeouts.cloud_secs == 0 || self.timeouts.embedding_secs == 0 {
            return Err(config_error("Timeouts must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(config_error("retry.max_attempts must be at least 1"));
        }
        if self.toolkit.crf > 51 {
            return Err(config_error(format!("toolkit.crf must be within 0-51, got {}", self.toolkit.crf)));
        }
        if self.analysis_mode == AnalysisMode::Cloud && self.cloud.endpoint.is_none() {
            return Err(config_error("analysis_mode = \"cloud\" requires cloud.endpoint"));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> SceneSplitError {
    SceneSplitError::ConfigError {
        message: message.into(),
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> SceneSplitResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| config_error(format!("Invalid value for {}: '{}'", key, raw)))
}
