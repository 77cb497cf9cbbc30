//! In-memory collaborators for pipeline tests; no ffmpeg required

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scenesplit_cli::adapters::toml_config::RetryOptions;
use scenesplit_cli::adapters::FsLocalAdapter;
use scenesplit_cli::app::container::AppPorts;
use scenesplit_cli::domain::errors::DomainError;
use scenesplit_cli::domain::model::*;
use scenesplit_cli::ports::*;
use scenesplit_cli::PipelineOptions;

/// Size written for a healthy cut
pub const GOOD_CLIP_BYTES: usize = 4096;
/// Size written for a cut that should fail validation
pub const TINY_CLIP_BYTES: usize = 100;

/// Pixel value the fake decoder paints for a given shot
pub fn shot_fill(index: usize) -> u8 {
    ((index * 60) % 256) as u8
}

/// Shot index encoded in `<stem>_shot_NNN.<ext>`
pub fn shot_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_string_lossy().to_string();
    let (_, index) = stem.rsplit_once("_shot_")?;
    index.parse().ok()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Probe that answers from a table keyed by file name
#[derive(Default)]
pub struct MockProbe {
    durations: HashMap<String, f64>,
}

impl MockProbe {
    pub fn with(mut self, name: &str, duration: f64) -> Self {
        self.durations.insert(name.to_string(), duration);
        self
    }
}

#[async_trait]
impl ProbePort for MockProbe {
    async fn probe_duration(&self, file_path: &Path) -> Result<f64, DomainError> {
        self.durations
            .get(&file_name(file_path))
            .copied()
            .ok_or_else(|| DomainError::InvalidResponse("ffprobe reported no duration".into()))
    }
}

/// Fake ffmpeg: cuts write placeholder files, frames are solid colours per shot
#[derive(Default)]
pub struct MockToolkit {
    scores: HashMap<String, Vec<SceneScore>>,
    tiny_shots: HashSet<usize>,
    failing_shots: HashSet<usize>,
    fail_reencode: bool,
    uniform_frames: bool,
    pub cuts: Mutex<Vec<CutRequest>>,
}

impl MockToolkit {
    /// Scene cuts with score 0.9 at each timestamp
    pub fn with_cuts(mut self, name: &str, times: &[f64]) -> Self {
        let scores = times.iter().map(|&time| SceneScore { time, score: 0.9 }).collect();
        self.scores.insert(name.to_string(), scores);
        self
    }

    pub fn with_tiny_shots(mut self, shots: &[usize]) -> Self {
        self.tiny_shots.extend(shots);
        self
    }

    pub fn with_failing_shots(mut self, shots: &[usize]) -> Self {
        self.failing_shots.extend(shots);
        self
    }

    pub fn failing_reencode(mut self) -> Self {
        self.fail_reencode = true;
        self
    }

    /// Paint every shot with the colour of shot 0
    pub fn with_uniform_frames(mut self) -> Self {
        self.uniform_frames = true;
        self
    }

    pub fn reencodes(&self) -> Vec<CutRequest> {
        self.cuts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.mode == CutMode::ReEncode)
            .cloned()
            .collect()
    }

    pub fn cut_count(&self) -> usize {
        self.cuts.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutePort for MockToolkit {
    async fn scene_scores(&self, file_path: &Path) -> Result<Vec<SceneScore>, DomainError> {
        Ok(self.scores.get(&file_name(file_path)).cloned().unwrap_or_default())
    }

    async fn cut_segment(&self, request: &CutRequest) -> Result<(), DomainError> {
        self.cuts.lock().unwrap().push(request.clone());

        let size = match request.mode {
            CutMode::ReEncode if self.fail_reencode => {
                return Err(DomainError::tool_failed("ffmpeg", "Conversion failed!", Some(1)));
            }
            CutMode::ReEncode => GOOD_CLIP_BYTES,
            CutMode::StreamCopy => {
                let index = shot_index(&request.output).unwrap_or(usize::MAX);
                if self.failing_shots.contains(&index) {
                    return Err(DomainError::tool_failed("ffmpeg", "Invalid argument", Some(1)));
                }
                if self.tiny_shots.contains(&index) {
                    TINY_CLIP_BYTES
                } else {
                    GOOD_CLIP_BYTES
                }
            }
        };

        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.output, vec![0u8; size]).await?;
        Ok(())
    }

    async fn extract_frames(&self, file_path: &Path, timestamps: &[f64]) -> Result<Vec<Frame>, DomainError> {
        let index = shot_index(file_path)
            .ok_or_else(|| DomainError::ProcessingError(format!("cannot decode {}", file_path.display())))?;
        let fill = if self.uniform_frames { shot_fill(0) } else { shot_fill(index) };
        timestamps
            .iter()
            .map(|_| Frame::new(2, 2, vec![fill; 12]))
            .collect()
    }
}

/// Embedding model that places shot `i` at angle `angles[i]` on the unit circle
pub struct MockEmbedding {
    angles: Vec<f64>,
    failing_call: Option<usize>,
    pub calls: AtomicUsize,
}

impl MockEmbedding {
    pub fn with_angles(angles: Vec<f64>) -> Self {
        Self {
            angles,
            failing_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// The `call`-th request (1-based) fails as if the service went down
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.failing_call = Some(call);
        self
    }

    /// Angles whose neighbouring pairs score exactly `similarities` in [0, 1]
    pub fn for_similarities(similarities: &[f64]) -> Self {
        let mut angles = vec![0.0];
        for s in similarities {
            let step = (2.0 * s - 1.0).clamp(-1.0, 1.0).acos();
            let last = angles[angles.len() - 1];
            angles.push(last + step);
        }
        Self::with_angles(angles)
    }
}

#[async_trait]
impl EmbeddingPort for MockEmbedding {
    async fn embed(&self, frames: &[Frame]) -> Result<Vec<Vec<f32>>, DomainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_call == Some(call) {
            return Err(DomainError::ServiceUnavailable("embedding model crashed".into()));
        }
        frames
            .iter()
            .map(|frame| {
                let index = (0..self.angles.len())
                    .find(|&i| shot_fill(i) == frame.rgb[0])
                    .ok_or_else(|| DomainError::InvalidResponse("unknown frame".into()))?;
                let angle = self.angles[index];
                Ok(vec![angle.cos() as f32, angle.sin() as f32])
            })
            .collect()
    }
}

/// Scripted cloud analyzer
pub enum CloudScript {
    Shots(Vec<(f64, f64)>),
    Empty,
    Reported(String),
    Down,
}

pub struct MockCloud {
    script: CloudScript,
    pub calls: AtomicUsize,
}

impl MockCloud {
    pub fn new(script: CloudScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CloudAnalyzerPort for MockCloud {
    async fn analyze(&self, _video_path: &Path, _features: &[String]) -> Result<CloudAnalysis, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            CloudScript::Shots(bounds) => Ok(CloudAnalysis {
                success: true,
                shots: bounds
                    .iter()
                    .enumerate()
                    .map(|(i, &(start, end))| ShotInterval::new(i, start, end, 0.9, ShotKind::Cloud).unwrap())
                    .collect(),
                error: None,
            }),
            CloudScript::Empty => Ok(CloudAnalysis {
                success: true,
                shots: Vec::new(),
                error: None,
            }),
            CloudScript::Reported(message) => Ok(CloudAnalysis {
                success: false,
                shots: Vec::new(),
                error: Some(message.clone()),
            }),
            CloudScript::Down => Err(DomainError::ServiceUnavailable("connection refused".into())),
        }
    }
}

/// Ports over the mocks and the real local filesystem
pub fn ports(
    probe: MockProbe,
    toolkit: Arc<MockToolkit>,
    cloud: Option<Arc<MockCloud>>,
    embedding: Option<Arc<MockEmbedding>>,
) -> AppPorts {
    AppPorts {
        probe: Arc::new(probe),
        execute: toolkit,
        fs: Arc::new(FsLocalAdapter::new()),
        cloud: cloud.map(|c| c as Arc<dyn CloudAnalyzerPort>),
        embedding: embedding.map(|e| e as Arc<dyn EmbeddingPort>),
    }
}

/// Test options: no retries, no waiting, output under `root/out`
pub fn options(root: &Path) -> PipelineOptions {
    let mut options = PipelineOptions::default();
    options.output_dir = root.join("out");
    options.analysis_mode = AnalysisMode::Local;
    options.retry = RetryOptions {
        max_attempts: 1,
        base_delay_ms: 0,
        jitter: 0.0,
    };
    options.concurrency.slice_workers = 3;
    options
}

/// Write a placeholder source video and return its path
pub fn source_video(root: &Path, name: &str) -> PathBuf {
    let path = root.join(name);
    std::fs::write(&path, b"not really a video").unwrap();
    path
}

/// Names of the regular files directly inside `dir`, sorted
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
