// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// How a shot interval was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotKind {
    /// Bounded by scene-change cut points from the media toolkit
    Scene,
    /// Synthetic fixed-length slice (no usable cut points)
    Uniform,
    /// Reported by the cloud analyzer
    Cloud,
}

/// A half-open time interval [start_time, end_time) of one shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotInterval {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub confidence: f32,
    pub kind: ShotKind,
}

impl ShotInterval {
    /// Create new shot interval with validation
    pub fn new(
        index: usize,
        start_time: f64,
        end_time: f64,
        confidence: f32,
        kind: ShotKind,
    ) -> Result<Self, DomainError> {
        if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Invalid shot bounds: {} - {}",
                start_time, end_time
            )));
        }
        if end_time <= start_time {
            return Err(DomainError::BadArgs(format!(
                "Shot end ({:.3}) must be after start ({:.3})",
                end_time, start_time
            )));
        }

        Ok(Self {
            index,
            start_time,
            end_time,
            duration: end_time - start_time,
            confidence: confidence.clamp(0.0, 1.0),
            kind,
        })
    }
}

/// One scene-change score sample emitted by the media toolkit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneScore {
    pub time: f64,
    pub score: f64,
}

/// Cutting strategy for the media toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMode {
    /// Packet copy, fast but keyframe-bound
    StreamCopy,
    /// Full decode/encode, frame accurate
    ReEncode,
}

/// A single cut the media toolkit should perform
#[derive(Debug, Clone, PartialEq)]
pub struct CutRequest {
    pub source: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub output: PathBuf,
    pub mode: CutMode,
}

/// Decoded RGB24 frame, downscaled for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, DomainError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || rgb.len() != expected {
            return Err(DomainError::InvalidResponse(format!(
                "Frame buffer of {} bytes does not match {}x{} rgb24",
                rgb.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, rgb })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Rec. 601 luma per pixel
    pub fn luma(&self) -> Vec<f32> {
        self.rgb
            .chunks_exact(3)
            .map(|p| 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32)
            .collect()
    }
}

/// Which extraction path produced a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSource {
    Embedding,
    Descriptor,
}

/// L2-normalized numeric summary of a clip's visual content
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f32>,
    pub source: FeatureSource,
}

impl FeatureVector {
    /// Build a vector, normalizing to unit length. Returns None for empty or all-zero input.
    pub fn normalized(values: Vec<f32>, source: FeatureSource) -> Option<Self> {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if values.is_empty() || !norm.is_finite() || norm <= f32::EPSILON {
            return None;
        }
        Some(Self {
            values: values.into_iter().map(|v| v / norm).collect(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lineage of a consolidated clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeProvenance {
    pub original_count: usize,
    pub original_indices: Vec<usize>,
    pub merge_similarity: f32,
}

/// One materialized video file plus its time range and lineage metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub file_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub source_video: PathBuf,
    pub sequence_index: usize,
    #[serde(skip)]
    pub feature_vector: Option<FeatureVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_to_next: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_gap_to_next: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<MergeProvenance>,
}

impl Clip {
    /// Clip materialized 1:1 from a shot interval
    pub fn from_shot(shot: &ShotInterval, file_path: PathBuf, source_video: &Path) -> Self {
        Self {
            file_path,
            start_time: shot.start_time,
            end_time: shot.end_time,
            duration: shot.duration,
            source_video: source_video.to_path_buf(),
            sequence_index: shot.index,
            feature_vector: None,
            similarity_to_next: None,
            time_gap_to_next: None,
            provenance: None,
        }
    }

    /// Consolidated clip replacing a merged run
    pub fn consolidated(run: &[Clip], file_path: PathBuf, merge_similarity: f32) -> Result<Self, DomainError> {
        let (first, last) = match (run.first(), run.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DomainError::BadArgs("Cannot consolidate an empty run".to_string())),
        };

        let original_indices = run
            .iter()
            .flat_map(|clip| clip.original_indices())
            .collect::<Vec<_>>();

        Ok(Self {
            file_path,
            start_time: first.start_time,
            end_time: last.end_time,
            duration: last.end_time - first.start_time,
            source_video: first.source_video.clone(),
            sequence_index: first.sequence_index,
            feature_vector: None,
            similarity_to_next: None,
            time_gap_to_next: None,
            provenance: Some(MergeProvenance {
                original_count: original_indices.len(),
                original_indices,
                merge_similarity,
            }),
        })
    }

    pub fn is_merged(&self) -> bool {
        self.provenance.is_some()
    }

    /// Shot indices this clip covers
    pub fn original_indices(&self) -> Vec<usize> {
        match &self.provenance {
            Some(p) => p.original_indices.clone(),
            None => vec![self.sequence_index],
        }
    }

    /// Time between this clip's end and the next clip's start, never negative
    pub fn gap_to(&self, next: &Clip) -> f64 {
        (next.start_time - self.end_time).max(0.0)
    }
}

/// Where the shot list for a video came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Cloud,
    Local,
}

/// Which analysis path the orchestrator should take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Cloud first, local detector on any failure
    #[default]
    Auto,
    Local,
    Cloud,
}

impl AnalysisMode {
    /// Parse analysis mode from string
    pub fn parse(mode_str: &str) -> Result<Self, DomainError> {
        match mode_str.trim().to_lowercase().as_str() {
            "auto" => Ok(AnalysisMode::Auto),
            "local" => Ok(AnalysisMode::Local),
            "cloud" => Ok(AnalysisMode::Cloud),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid analysis mode: {}. Valid modes: auto, local, cloud",
                mode_str
            ))),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisMode::Auto => "auto",
            AnalysisMode::Local => "local",
            AnalysisMode::Cloud => "cloud",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a cloud analysis call that reached the service
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAnalysis {
    pub success: bool,
    pub shots: Vec<ShotInterval>,
    pub error: Option<String>,
}

/// Per-video pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStage {
    Pending,
    AnalyzingCloud,
    AnalyzingLocal,
    Slicing,
    Merging,
    Validating,
    Done,
    Failed,
}

impl VideoStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStage::Done | VideoStage::Failed)
    }
}

/// Time spent in one visited stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: VideoStage,
    pub elapsed_ms: u64,
}

/// Per-stage timing breakdown for one video
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoTiming {
    pub analysis_ms: u64,
    pub slicing_ms: u64,
    pub merging_ms: u64,
    pub validation_ms: u64,
    pub total_ms: u64,
}

/// Quality gate result for one video
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub success_rate: f64,
    pub passed: bool,
}

/// Result of processing one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub video_path: PathBuf,
    pub success: bool,
    pub clip_count: usize,
    #[serde(default)]
    pub shot_count: usize,
    #[serde(default)]
    pub merged_groups: usize,
    #[serde(default)]
    pub failed_slices: usize,
    #[serde(default)]
    pub analysis_source: Option<AnalysisSource>,
    pub final_stage: VideoStage,
    #[serde(default)]
    pub stages: Vec<StageTiming>,
    #[serde(default)]
    pub timing: VideoTiming,
    #[serde(default)]
    pub validation: Option<ValidationSummary>,
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<String>,
}

impl VideoResult {
    /// Fresh result in the PENDING state
    pub fn pending(video_path: &Path) -> Self {
        Self {
            video_path: video_path.to_path_buf(),
            success: false,
            clip_count: 0,
            shot_count: 0,
            merged_groups: 0,
            failed_slices: 0,
            analysis_source: None,
            final_stage: VideoStage::Pending,
            stages: Vec::new(),
            timing: VideoTiming::default(),
            validation: None,
            manifest_path: None,
            error: None,
        }
    }

    /// Result for a video whose worker never produced one (e.g. panicked)
    pub fn aborted(video_path: &Path, reason: impl Into<String>) -> Self {
        let mut result = Self::pending(video_path);
        result.final_stage = VideoStage::Failed;
        result.error = Some(reason.into());
        result
    }
}

/// Aggregate report for one batch run, written once at the end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_videos: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_slices: usize,
    #[serde(default)]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub results: Vec<VideoResult>,
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            total_videos: 0,
            succeeded: 0,
            failed: 0,
            total_slices: 0,
            elapsed_ms: 0,
            results: Vec::new(),
            manifest_path: None,
        }
    }

    /// Append one video's outcome and update the aggregate counts
    pub fn record(&mut self, result: VideoResult) {
        self.total_videos += 1;
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.total_slices += result.clip_count;
        self.results.push(result);
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Error messages keyed by video path
    pub fn errors(&self) -> Vec<(PathBuf, String)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.video_path.clone(), e.clone())))
            .collect()
    }
}

/// One clip entry as persisted in a slice manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestClip {
    pub file_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub sequence_index: usize,
    #[serde(default)]
    pub is_merged: bool,
    #[serde(default = "default_original_count")]
    pub original_count: usize,
    #[serde(default)]
    pub original_indices: Vec<usize>,
    #[serde(default)]
    pub merge_similarity: Option<f32>,
}

fn default_original_count() -> usize {
    1
}

impl From<&Clip> for ManifestClip {
    fn from(clip: &Clip) -> Self {
        Self {
            file_path: clip.file_path.clone(),
            start_time: clip.start_time,
            end_time: clip.end_time,
            duration: clip.duration,
            sequence_index: clip.sequence_index,
            is_merged: clip.is_merged(),
            original_count: clip.provenance.as_ref().map_or(1, |p| p.original_count),
            original_indices: clip.original_indices(),
            merge_similarity: clip.provenance.as_ref().map(|p| p.merge_similarity),
        }
    }
}

/// Per-video slice manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceManifest {
    pub source_video: PathBuf,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub analysis_source: Option<AnalysisSource>,
    #[serde(default)]
    pub shot_count: usize,
    #[serde(default)]
    pub clips: Vec<ManifestClip>,
    #[serde(default)]
    pub validation: ValidationSummary,
}

impl SliceManifest {
    pub fn new(
        source_video: &Path,
        analysis_source: Option<AnalysisSource>,
        shot_count: usize,
        clips: &[Clip],
        validation: ValidationSummary,
    ) -> Self {
        Self {
            source_video: source_video.to_path_buf(),
            generated_at: Utc::now(),
            analysis_source,
            shot_count,
            clips: clips.iter().map(ManifestClip::from).collect(),
            validation,
        }
    }
}
