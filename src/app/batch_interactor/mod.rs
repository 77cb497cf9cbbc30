// Batch interactor - Runs many videos through the pipeline under a concurrency cap

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info};

use crate::adapters::toml_config::PipelineOptions;
use crate::app::pipeline_interactor::PipelineInteractor;
use crate::domain::model::*;
use crate::output::ArtifactWriter;
use crate::utils::path::{OutputNaming, RUN_REPORT_FILE_NAME};
use crate::utils::progress::ProgressCounter;
use crate::utils::worker_pool::run_bounded;
use crate::utils::Utils;

/// Interactor for whole-batch runs
pub struct BatchInteractor {
    pipeline: Arc<PipelineInteractor>,
    writer: ArtifactWriter,
}

impl BatchInteractor {
    pub fn new(pipeline: Arc<PipelineInteractor>, writer: ArtifactWriter) -> Self {
        Self { pipeline, writer }
    }

    /// Process every video with at most `max_concurrent_videos` in flight.
    ///
    /// Always returns a report covering every input, whatever happened to each video.
    pub async fn process_batch(
        &self,
        paths: Vec<PathBuf>,
        options: &PipelineOptions,
        max_concurrent_videos: usize,
    ) -> RunReport {
        let started = Instant::now();
        let report = Arc::new(Mutex::new(RunReport::new(Utc::now())));
        let progress = ProgressCounter::new("videos", paths.len());
        info!(videos = paths.len(), width = max_concurrent_videos, "Batch started");

        let pipeline = Arc::clone(&self.pipeline);
        let shared_options = Arc::new(options.clone());
        let sink = Arc::clone(&report);
        let counter = progress.clone();

        let dirs = OutputNaming::unique_output_dirs(&options.output_dir, &paths);
        let jobs: Vec<(PathBuf, PathBuf)> = paths.iter().cloned().zip(dirs).collect();

        let outcomes = run_bounded(max_concurrent_videos, jobs, move |(path, video_dir): (PathBuf, PathBuf)| {
            let pipeline = Arc::clone(&pipeline);
            let options = Arc::clone(&shared_options);
            let sink = Arc::clone(&sink);
            let counter = counter.clone();
            async move {
                let result = pipeline.process_video_in(&path, &video_dir, &options).await;
                if result.success {
                    counter.record_success();
                } else {
                    counter.record_failure();
                }
                sink.lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .record(result);
            }
        })
        .await;

        let mut report = {
            let mut guard = report.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for (path, outcome) in paths.iter().zip(outcomes) {
                if let Err(e) = outcome {
                    progress.record_failure();
                    guard.record(VideoResult::aborted(path, e.to_string()));
                }
            }
            guard.clone()
        };

        report.finished_at = Some(Utc::now());
        report.elapsed_ms = Utils::elapsed_ms(started);
        report.manifest_path = Some(options.output_dir.join(RUN_REPORT_FILE_NAME));
        if let Err(e) = self.writer.write_run_report(&options.output_dir, &report).await {
            error!(error = %e, "Failed to write run report");
            report.manifest_path = None;
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            slices = report.total_slices,
            "Batch finished"
        );
        report
    }
}
