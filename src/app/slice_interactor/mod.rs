// Slice interactor - Cuts every shot interval into its own file

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::utils::path::OutputNaming;
use crate::utils::progress::ProgressCounter;
use crate::utils::retry::RetryPolicy;
use crate::utils::worker_pool::run_bounded;

/// Clips that were cut plus the number of shots that failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceOutcome {
    pub clips: Vec<Clip>,
    pub failed: usize,
}

/// Interactor that materializes shot intervals through a bounded worker pool
#[derive(Clone)]
pub struct SliceInteractor {
    execute_port: Arc<dyn ExecutePort>,
    fs_port: Arc<dyn FsPort>,
    retry: RetryPolicy,
    workers: usize,
}

impl SliceInteractor {
    pub fn new(
        execute_port: Arc<dyn ExecutePort>,
        fs_port: Arc<dyn FsPort>,
        retry: RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            execute_port,
            fs_port,
            retry,
            workers: workers.max(1),
        }
    }

    /// Cut each shot with stream copy. Only an unusable output directory is an error;
    /// individual cut failures are counted and their siblings carry on.
    pub async fn materialize(
        &self,
        video: &Path,
        shots: &[ShotInterval],
        output_dir: &Path,
    ) -> Result<SliceOutcome, DomainError> {
        if shots.is_empty() {
            return Ok(SliceOutcome::default());
        }
        self.fs_port.create_directory(output_dir).await?;

        let progress = ProgressCounter::new(format!("slicing {}", OutputNaming::video_stem(video)), shots.len());
        let execute_port = Arc::clone(&self.execute_port);
        let retry = self.retry;
        let source = video.to_path_buf();
        let dir = output_dir.to_path_buf();
        let counter = progress.clone();

        let results = run_bounded(self.workers, shots.to_vec(), move |shot: ShotInterval| {
            let execute_port = Arc::clone(&execute_port);
            let source = source.clone();
            let dir = dir.clone();
            let counter = counter.clone();
            async move {
                let output = OutputNaming::shot_file(&dir, &source, shot.index);
                match cut_shot(execute_port.as_ref(), retry, &source, &shot, &output).await {
                    Ok(()) => {
                        counter.record_success();
                        Some(Clip::from_shot(&shot, output, &source))
                    }
                    Err(e) => {
                        counter.record_failure();
                        warn!(shot = shot.index, error = %e, "Slice failed");
                        None
                    }
                }
            }
        })
        .await;

        let mut outcome = SliceOutcome::default();
        for result in results {
            match result {
                Ok(Some(clip)) => outcome.clips.push(clip),
                Ok(None) | Err(_) => outcome.failed += 1,
            }
        }
        // Completion order is arbitrary
        outcome.clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        info!(
            video = %video.display(),
            clips = outcome.clips.len(),
            failed = outcome.failed,
            "Slicing complete"
        );
        Ok(outcome)
    }
}

async fn cut_shot(
    execute_port: &dyn ExecutePort,
    retry: RetryPolicy,
    source: &Path,
    shot: &ShotInterval,
    output: &Path,
) -> Result<(), DomainError> {
    let request = CutRequest {
        source: source.to_path_buf(),
        start: shot.start_time,
        duration: shot.duration,
        output: output.to_path_buf(),
        mode: CutMode::StreamCopy,
    };
    retry
        .run("stream-copy cut", || execute_port.cut_segment(&request))
        .await
}
