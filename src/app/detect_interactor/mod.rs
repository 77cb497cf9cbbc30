// Detect interactor - Local shot boundary detection

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::toml_config::DetectionOptions;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;
use crate::utils::retry::RetryPolicy;

/// Interactor for local shot detection.
///
/// Never surfaces a toolkit error: a failed scene-score run counts as "no cuts" and
/// falls back to uniform segmentation. The result is empty only when the duration
/// itself cannot be read.
#[derive(Clone)]
pub struct DetectInteractor {
    probe_port: Arc<dyn ProbePort>,
    execute_port: Arc<dyn ExecutePort>,
    retry: RetryPolicy,
}

impl DetectInteractor {
    pub fn new(probe_port: Arc<dyn ProbePort>, execute_port: Arc<dyn ExecutePort>, retry: RetryPolicy) -> Self {
        Self {
            probe_port,
            execute_port,
            retry,
        }
    }

    /// Ordered shot intervals covering [0, duration)
    pub async fn detect(&self, video: &Path, options: &DetectionOptions) -> Vec<ShotInterval> {
        let duration = match self
            .retry
            .run("ffprobe duration", || self.probe_port.probe_duration(video))
            .await
        {
            Ok(duration) => duration,
            Err(e) => {
                warn!(video = %video.display(), error = %e, "Duration unavailable, no shots detected");
                return Vec::new();
            }
        };

        if options.raw_boundaries() {
            info!(video = %video.display(), "Raw-boundary mode, using uniform segmentation");
            return ShotSegmenter::uniform_segments(duration);
        }

        let scores = match self
            .retry
            .run("scene scoring", || self.execute_port.scene_scores(video))
            .await
        {
            Ok(scores) => scores,
            Err(e) => {
                warn!(video = %video.display(), error = %e, "Scene scoring failed, treating as zero cuts");
                Vec::new()
            }
        };

        let cuts = ShotSegmenter::cut_points(&scores, options.sensitivity, duration);
        if cuts.is_empty() {
            info!(video = %video.display(), duration, "No scene cuts found, falling back to uniform segmentation");
            return ShotSegmenter::uniform_segments(duration);
        }

        let shots = ShotSegmenter::intervals_from_cuts(&cuts, duration);
        let raw_count = shots.len();
        let shots = ShotSegmenter::fold_short_shots(shots, options.min_shot_duration);
        debug!(cuts = cuts.len(), raw_count, folded_count = shots.len(), "Shots derived");
        info!(video = %video.display(), shots = shots.len(), "Local detection complete");
        shots
    }
}
