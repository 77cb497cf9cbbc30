// Merge interactor - Consolidates runs of visually similar adjacent clips

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::adapters::toml_config::MergeOptions;
use crate::app::feature_interactor::FeatureExtractor;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;
use crate::utils::path::OutputNaming;
use crate::utils::retry::RetryPolicy;
use crate::utils::worker_pool::run_bounded;

/// Final clip list and how many runs were consolidated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub clips: Vec<Clip>,
    pub merged_groups: usize,
}

/// Interactor for the similarity-based merge stage.
///
/// A run is replaced in two phases: the consolidated file is re-encoded and checked
/// to be non-empty, then every original is copied into the backup directory and
/// deleted. Nothing is deleted unless the first phase succeeded.
#[derive(Clone)]
pub struct MergeInteractor {
    execute_port: Arc<dyn ExecutePort>,
    fs_port: Arc<dyn FsPort>,
    extractor: Arc<FeatureExtractor>,
    retry: RetryPolicy,
    workers: usize,
}

impl MergeInteractor {
    pub fn new(
        execute_port: Arc<dyn ExecutePort>,
        fs_port: Arc<dyn FsPort>,
        extractor: Arc<FeatureExtractor>,
        retry: RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            execute_port,
            fs_port,
            extractor,
            retry,
            workers: workers.max(1),
        }
    }

    /// Merge clips of one source video in place inside `output_dir`
    pub async fn merge(
        &self,
        mut clips: Vec<Clip>,
        source_video: &Path,
        output_dir: &Path,
        options: &MergeOptions,
    ) -> MergeOutcome {
        clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        if clips.len() < 2 {
            return MergeOutcome {
                clips,
                merged_groups: 0,
            };
        }
        let original = clips.clone();

        for pair in clips.windows(2) {
            let gap = pair[0].gap_to(&pair[1]);
            if gap > options.comparison_gap {
                warn!(
                    after = pair[0].sequence_index,
                    gap = %format!("{:.2}", gap),
                    "Gap between clips, pair will not be merged"
                );
            }
        }

        self.attach_features(&mut clips).await;
        annotate_neighbors(&mut clips, options.comparison_gap);

        let limits = options.limits();
        let groups = plan_merge_groups(&clips, &limits);
        if groups.iter().all(|g| g.len() < 2) {
            debug!(video = %source_video.display(), "No adjacent pair qualifies for merging");
            return MergeOutcome {
                clips: original,
                merged_groups: 0,
            };
        }

        let mut merged = Vec::with_capacity(groups.len());
        let mut merged_groups = 0;
        for group in groups {
            let run = &clips[group];
            if run.len() < 2 {
                merged.push(strip_annotations(run[0].clone()));
                continue;
            }
            match self.commit_run(run, source_video, output_dir).await {
                Ok(consolidated) => {
                    merged_groups += 1;
                    merged.push(consolidated);
                }
                Err(e) => {
                    error!(
                        first = run[0].sequence_index,
                        count = run.len(),
                        error = %e,
                        "Merge failed, keeping originals"
                    );
                    merged.extend(run.iter().cloned().map(strip_annotations));
                }
            }
        }

        info!(
            video = %source_video.display(),
            before = clips.len(),
            after = merged.len(),
            merged_groups,
            "Merge complete"
        );
        MergeOutcome {
            clips: merged,
            merged_groups,
        }
    }

    async fn attach_features(&self, clips: &mut [Clip]) {
        let pending: Vec<(usize, Clip)> = clips
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_merged())
            .map(|(i, c)| (i, c.clone()))
            .collect();

        let extractor = Arc::clone(&self.extractor);
        let results = run_bounded(self.workers, pending, move |(index, clip): (usize, Clip)| {
            let extractor = Arc::clone(&extractor);
            async move { (index, extractor.extract(&clip).await) }
        })
        .await;

        for (index, vector) in results.into_iter().flatten() {
            clips[index].feature_vector = vector;
        }

        if has_mixed_sources(clips) {
            warn!("Embedding service failed mid-run, re-describing embedded clips");
            self.redescribe_embedded(clips).await;
        }
    }

    /// Replace embedding vectors with descriptors so every clip is comparable
    async fn redescribe_embedded(&self, clips: &mut [Clip]) {
        let embedded: Vec<(usize, Clip)> = clips
            .iter()
            .enumerate()
            .filter(|(_, c)| feature_source(c) == Some(FeatureSource::Embedding))
            .map(|(i, c)| (i, c.clone()))
            .collect();

        let extractor = Arc::clone(&self.extractor);
        let results = run_bounded(self.workers, embedded, move |(index, clip): (usize, Clip)| {
            let extractor = Arc::clone(&extractor);
            async move { (index, extractor.describe(&clip).await) }
        })
        .await;

        for (index, vector) in results.into_iter().flatten() {
            clips[index].feature_vector = vector;
        }
        // Anything still embedded could not be re-read
        for clip in clips.iter_mut() {
            if feature_source(clip) == Some(FeatureSource::Embedding) {
                clip.feature_vector = None;
            }
        }
    }

    /// Phase 1: produce and verify the replacement. Phase 2: back up then delete.
    async fn commit_run(&self, run: &[Clip], source_video: &Path, output_dir: &Path) -> Result<Clip, DomainError> {
        let (first, last) = match (run.first(), run.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(DomainError::BadArgs("Empty merge run".to_string())),
        };

        let output = OutputNaming::merged_file(output_dir, source_video, first.sequence_index, last.sequence_index);
        let request = CutRequest {
            source: source_video.to_path_buf(),
            start: first.start_time,
            duration: last.end_time - first.start_time,
            output: output.clone(),
            mode: CutMode::ReEncode,
        };

        let encoded = self
            .retry
            .run("merge re-encode", || self.execute_port.cut_segment(&request))
            .await;
        let verified = match encoded {
            Ok(()) => self.fs_port.file_size(&output).await,
            Err(e) => Err(e),
        };
        match verified {
            Ok(Some(size)) if size > 0 => {}
            Ok(_) => {
                self.discard(&output).await;
                return Err(DomainError::ValidationFailed(format!(
                    "Merged output {} is missing or empty",
                    output.display()
                )));
            }
            Err(e) => {
                self.discard(&output).await;
                return Err(e);
            }
        }

        let backup_dir = OutputNaming::backup_dir(output_dir);
        let backed_up = self.back_up(run, &backup_dir).await;
        if let Err(e) = backed_up {
            self.discard(&output).await;
            return Err(e);
        }

        for clip in run {
            if let Err(e) = self.fs_port.delete_file(&clip.file_path).await {
                warn!(clip = %clip.file_path.display(), error = %e, "Could not remove merged original");
            }
        }

        let similarity = mean_run_similarity(run);
        info!(
            first = first.sequence_index,
            last = last.sequence_index,
            similarity = %format!("{:.3}", similarity),
            output = %output.display(),
            "Merged run"
        );
        Clip::consolidated(run, output, similarity)
    }

    async fn back_up(&self, run: &[Clip], backup_dir: &Path) -> Result<(), DomainError> {
        self.fs_port.create_directory(backup_dir).await?;
        for clip in run {
            let name = clip
                .file_path
                .file_name()
                .ok_or_else(|| DomainError::BadArgs(format!("Clip path has no file name: {}", clip.file_path.display())))?;
            self.fs_port.copy_file(&clip.file_path, &backup_dir.join(name)).await?;
        }
        Ok(())
    }

    async fn discard(&self, output: &Path) {
        if let Ok(Some(_)) = self.fs_port.file_size(output).await {
            if let Err(e) = self.fs_port.delete_file(output).await {
                warn!(output = %output.display(), error = %e, "Could not remove partial merge output");
            }
        }
    }
}

/// Store similarity and gap to the next clip on each clip. Pairs further apart than
/// `comparison_gap` score 0; merged clips keep no similarity.
pub fn annotate_neighbors(clips: &mut [Clip], comparison_gap: f64) {
    for i in 0..clips.len().saturating_sub(1) {
        let gap = clips[i].gap_to(&clips[i + 1]);
        let similarity = if clips[i].is_merged() || clips[i + 1].is_merged() {
            None
        } else if gap > comparison_gap {
            Some(0.0)
        } else {
            Some(visual_similarity(
                clips[i].feature_vector.as_ref(),
                clips[i + 1].feature_vector.as_ref(),
            ))
        };
        clips[i].time_gap_to_next = Some(gap);
        clips[i].similarity_to_next = similarity;
    }
}

fn feature_source(clip: &Clip) -> Option<FeatureSource> {
    clip.feature_vector.as_ref().map(|v| v.source)
}

/// Whether some clips carry embeddings while others carry descriptors
fn has_mixed_sources(clips: &[Clip]) -> bool {
    let mut sources = clips.iter().filter_map(feature_source);
    match sources.next() {
        Some(first) => sources.any(|s| s != first),
        None => false,
    }
}

/// Drop per-run analysis state from a clip that leaves the merge stage unchanged
fn strip_annotations(mut clip: Clip) -> Clip {
    clip.feature_vector = None;
    clip.similarity_to_next = None;
    clip.time_gap_to_next = None;
    clip
}
