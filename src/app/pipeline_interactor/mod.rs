// Pipeline interactor - Per-video state machine: analyze, slice, merge, validate

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, warn, Instrument};

use crate::adapters::toml_config::PipelineOptions;
use crate::app::detect_interactor::DetectInteractor;
use crate::app::merge_interactor::MergeInteractor;
use crate::app::slice_interactor::SliceInteractor;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::output::{ArtifactWriter, OutputVerifier};
use crate::ports::*;
use crate::utils::path::OutputNaming;
use crate::utils::retry::RetryPolicy;
use crate::utils::Utils;

/// Records visited stages and their durations for one video
struct StageTracker {
    result: VideoResult,
    video_started: Instant,
    stage_started: Instant,
}

impl StageTracker {
    fn new(video: &Path) -> Self {
        let now = Instant::now();
        Self {
            result: VideoResult::pending(video),
            video_started: now,
            stage_started: now,
        }
    }

    fn stage(&self) -> VideoStage {
        self.result.final_stage
    }

    fn enter(&mut self, next: VideoStage) {
        self.close_stage();
        self.result.final_stage = next;
    }

    fn close_stage(&mut self) {
        let current = self.result.final_stage;
        if current != VideoStage::Pending && !current.is_terminal() {
            let elapsed_ms = Utils::elapsed_ms(self.stage_started);
            self.result.stages.push(StageTiming {
                stage: current,
                elapsed_ms,
            });
            let timing = &mut self.result.timing;
            match current {
                VideoStage::AnalyzingCloud | VideoStage::AnalyzingLocal => timing.analysis_ms += elapsed_ms,
                VideoStage::Slicing => timing.slicing_ms += elapsed_ms,
                VideoStage::Merging => timing.merging_ms += elapsed_ms,
                VideoStage::Validating => timing.validation_ms += elapsed_ms,
                _ => {}
            }
        }
        self.stage_started = Instant::now();
    }

    fn finish(mut self, error: Option<String>) -> VideoResult {
        let failed_in = self.stage();
        self.close_stage();
        self.result.success = error.is_none();
        self.result.final_stage = if error.is_none() {
            VideoStage::Done
        } else {
            VideoStage::Failed
        };
        self.result.timing.total_ms = Utils::elapsed_ms(self.video_started);

        if let Some(message) = &error {
            error!(video = %self.result.video_path.display(), stage = ?failed_in, error = %message, "Video failed");
        } else {
            info!(
                video = %self.result.video_path.display(),
                clips = self.result.clip_count,
                elapsed = %Utils::format_duration(std::time::Duration::from_millis(self.result.timing.total_ms)),
                "Video done"
            );
        }
        self.result.error = error;
        self.result
    }
}

/// Interactor that runs one video through the whole pipeline.
///
/// Only this interactor decides that a video has failed; the stages beneath it report
/// failures in their documented shapes.
pub struct PipelineInteractor {
    cloud_port: Option<Arc<dyn CloudAnalyzerPort>>,
    fs_port: Arc<dyn FsPort>,
    detector: DetectInteractor,
    slicer: SliceInteractor,
    merger: MergeInteractor,
    writer: ArtifactWriter,
    verifier: OutputVerifier,
    retry: RetryPolicy,
}

impl PipelineInteractor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cloud_port: Option<Arc<dyn CloudAnalyzerPort>>,
        fs_port: Arc<dyn FsPort>,
        detector: DetectInteractor,
        slicer: SliceInteractor,
        merger: MergeInteractor,
        writer: ArtifactWriter,
        verifier: OutputVerifier,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cloud_port,
            fs_port,
            detector,
            slicer,
            merger,
            writer,
            verifier,
            retry,
        }
    }

    /// Process one video into `<output_dir>/<stem>/`
    pub async fn process_video(&self, video: &Path, options: &PipelineOptions) -> VideoResult {
        let video_dir = OutputNaming::video_output_dir(&options.output_dir, video);
        self.process_video_in(video, &video_dir, options).await
    }

    /// Process one video into `video_dir`; never returns an error, the outcome is in the result
    pub async fn process_video_in(&self, video: &Path, video_dir: &Path, options: &PipelineOptions) -> VideoResult {
        let span = info_span!("video", name = %OutputNaming::video_stem(video));
        async {
            let mut tracker = StageTracker::new(video);
            let error = self.run_stages(video, video_dir, options, &mut tracker).await.err();
            tracker.finish(error.map(|e| e.to_string()))
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        video: &Path,
        video_dir: &Path,
        options: &PipelineOptions,
        tracker: &mut StageTracker,
    ) -> Result<(), DomainError> {
        if self.fs_port.file_size(video).await?.is_none() {
            return Err(DomainError::FileNotFound(video.display().to_string()));
        }
        self.fs_port.create_directory(video_dir).await?;

        let (shots, source) = self.analyze(video, options, tracker).await?;
        tracker.result.analysis_source = Some(source);
        tracker.result.shot_count = shots.len();

        tracker.enter(VideoStage::Slicing);
        let sliced = self.slicer.materialize(video, &shots, video_dir).await?;
        tracker.result.failed_slices = sliced.failed;
        let mut clips = sliced.clips;

        if options.merge.enabled && clips.len() > 1 {
            tracker.enter(VideoStage::Merging);
            let outcome = self.merger.merge(clips, video, video_dir, &options.merge).await;
            tracker.result.merged_groups = outcome.merged_groups;
            clips = outcome.clips;
        }
        tracker.result.clip_count = clips.len();

        tracker.enter(VideoStage::Validating);
        let policy = options.validation.policy();
        let summary = self.verifier.verify(&clips, sliced.failed, &policy).await;
        tracker.result.validation = Some(summary.clone());

        // Written even when the gate fails so partial output stays traceable
        let manifest = SliceManifest::new(video, Some(source), shots.len(), &clips, summary.clone());
        let manifest_path = self.writer.write_manifest(video_dir, video, &manifest).await?;
        tracker.result.manifest_path = Some(manifest_path);

        if !summary.passed {
            return Err(DomainError::ValidationFailed(format!(
                "{} of {} slices valid ({:.0}%), below the {:.0}% threshold",
                summary.valid,
                summary.total,
                summary.success_rate * 100.0,
                policy.min_success_rate * 100.0
            )));
        }
        Ok(())
    }

    /// Choose the shot list: cloud first in auto mode, local on any cloud failure
    async fn analyze(
        &self,
        video: &Path,
        options: &PipelineOptions,
        tracker: &mut StageTracker,
    ) -> Result<(Vec<ShotInterval>, AnalysisSource), DomainError> {
        match options.analysis_mode {
            AnalysisMode::Cloud => {
                tracker.enter(VideoStage::AnalyzingCloud);
                let shots = self.analyze_cloud(video, options).await?;
                Ok((shots, AnalysisSource::Cloud))
            }
            AnalysisMode::Auto if self.cloud_port.is_some() => {
                tracker.enter(VideoStage::AnalyzingCloud);
                match self.analyze_cloud(video, options).await {
                    Ok(shots) => Ok((shots, AnalysisSource::Cloud)),
                    Err(e) => {
                        warn!(error = %e, "Cloud analysis unusable, falling back to local detection");
                        self.analyze_local(video, options, tracker).await
                    }
                }
            }
            AnalysisMode::Auto | AnalysisMode::Local => self.analyze_local(video, options, tracker).await,
        }
    }

    async fn analyze_cloud(&self, video: &Path, options: &PipelineOptions) -> Result<Vec<ShotInterval>, DomainError> {
        let port = self
            .cloud_port
            .as_ref()
            .ok_or_else(|| DomainError::ServiceUnavailable("no cloud analyzer configured".to_string()))?;

        let analysis = self
            .retry
            .run("cloud analysis", || port.analyze(video, &options.cloud.features))
            .await?;

        if !analysis.success {
            return Err(DomainError::ServiceUnavailable(
                analysis
                    .error
                    .unwrap_or_else(|| "cloud analyzer reported failure".to_string()),
            ));
        }
        if analysis.shots.is_empty() {
            return Err(DomainError::InvalidResponse("cloud analyzer returned no shots".to_string()));
        }
        info!(shots = analysis.shots.len(), "Cloud analysis complete");
        Ok(analysis.shots)
    }

    async fn analyze_local(
        &self,
        video: &Path,
        options: &PipelineOptions,
        tracker: &mut StageTracker,
    ) -> Result<(Vec<ShotInterval>, AnalysisSource), DomainError> {
        tracker.enter(VideoStage::AnalyzingLocal);
        let shots = self.detector.detect(video, &options.detection).await;
        if shots.is_empty() {
            return Err(DomainError::ProcessingError(
                "Local detection produced no shots (duration unavailable)".to_string(),
            ));
        }
        Ok((shots, AnalysisSource::Local))
    }
}
