//! End-to-end pipeline and batch tests over mock media tooling

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use scenesplit_cli::app::container::{AppContainer, DefaultAppContainer};
use scenesplit_cli::domain::model::*;
use scenesplit_cli::utils::path::{OutputNaming, RUN_REPORT_FILE_NAME};
use tempfile::TempDir;

use common::*;

const FIVE_SHOT_CUTS: [f64; 4] = [3.0, 6.0, 9.0, 12.0];

fn five_shot_toolkit() -> MockToolkit {
    MockToolkit::default().with_cuts("trip.mp4", &FIVE_SHOT_CUTS)
}

fn probe() -> MockProbe {
    MockProbe::default().with("trip.mp4", 15.0)
}

fn visited(result: &VideoResult) -> Vec<VideoStage> {
    result.stages.iter().map(|s| s.stage).collect()
}

#[tokio::test]
async fn test_local_run_slices_every_shot() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let options = options(dir.path());
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), None, None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.final_stage, VideoStage::Done);
    assert_eq!(result.analysis_source, Some(AnalysisSource::Local));
    assert_eq!(result.shot_count, 5);
    assert_eq!(result.clip_count, 5);
    assert_eq!(
        visited(&result),
        vec![
            VideoStage::AnalyzingLocal,
            VideoStage::Slicing,
            VideoStage::Merging,
            VideoStage::Validating
        ]
    );

    let video_dir = OutputNaming::video_output_dir(&options.output_dir, &video);
    let manifest = result.manifest_path.clone().unwrap();
    assert_eq!(manifest, OutputNaming::manifest_file(&video_dir, &video));
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&manifest).unwrap()).unwrap();
    assert_eq!(json["clips"].as_array().unwrap().len(), 5);
    assert_eq!(json["analysisSource"], "local");
    assert_eq!(json["validation"]["passed"], true);
}

#[tokio::test]
async fn test_similar_shots_are_merged_end_to_end() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let options = options(dir.path());
    let toolkit = Arc::new(five_shot_toolkit());
    let embedding = Arc::new(MockEmbedding::for_similarities(&[0.95, 0.95, 0.10, 0.95]));
    let container = DefaultAppContainer::with_ports(
        ports(probe(), toolkit.clone(), None, Some(embedding.clone())),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.shot_count, 5);
    assert_eq!(result.clip_count, 2);
    assert_eq!(result.merged_groups, 2);
    let validation = result.validation.as_ref().unwrap();
    assert_eq!((validation.valid, validation.total), (5, 5));
    assert!(embedding.calls.load(Ordering::SeqCst) >= 5);

    let video_dir = OutputNaming::video_output_dir(&options.output_dir, &video);
    let remaining = files_in(&video_dir);
    assert!(remaining.iter().any(|f| f == "trip_merged_000_002.mp4"));
    assert!(remaining.iter().any(|f| f == "trip_merged_003_004.mp4"));
    assert!(!remaining.iter().any(|f| f.contains("_shot_")));
    assert_eq!(files_in(&OutputNaming::backup_dir(&video_dir)).len(), 5);

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(result.manifest_path.unwrap()).unwrap()).unwrap();
    let clips = json["clips"].as_array().unwrap();
    assert_eq!(clips[0]["isMerged"], true);
    assert_eq!(clips[0]["originalIndices"], serde_json::json!([0, 1, 2]));
    assert_eq!(clips[1]["originalCount"], 2);
}

#[tokio::test]
async fn test_empty_cloud_answer_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let mut options = options(dir.path());
    options.analysis_mode = AnalysisMode::Auto;
    let cloud = Arc::new(MockCloud::new(CloudScript::Empty));
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), Some(cloud.clone()), None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(cloud.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.analysis_source, Some(AnalysisSource::Local));
    assert_eq!(result.shot_count, 5);
    assert_eq!(&visited(&result)[..2], &[VideoStage::AnalyzingCloud, VideoStage::AnalyzingLocal]);
}

#[tokio::test]
async fn test_unreachable_cloud_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let mut options = options(dir.path());
    options.analysis_mode = AnalysisMode::Auto;
    let cloud = Arc::new(MockCloud::new(CloudScript::Down));
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), Some(cloud), None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.analysis_source, Some(AnalysisSource::Local));
}

#[tokio::test]
async fn test_cloud_shots_are_used_when_available() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let mut options = options(dir.path());
    options.analysis_mode = AnalysisMode::Auto;
    let cloud = Arc::new(MockCloud::new(CloudScript::Shots(vec![(0.0, 7.0), (7.0, 15.0)])));
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), Some(cloud), None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.analysis_source, Some(AnalysisSource::Cloud));
    assert_eq!(result.shot_count, 2);
    assert!(!visited(&result).contains(&VideoStage::AnalyzingLocal));
}

#[tokio::test]
async fn test_forced_cloud_failure_fails_video() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let mut options = options(dir.path());
    options.analysis_mode = AnalysisMode::Cloud;
    let cloud = Arc::new(MockCloud::new(CloudScript::Reported("quota exceeded".into())));
    let toolkit = Arc::new(five_shot_toolkit());
    let container = DefaultAppContainer::with_ports(
        ports(probe(), toolkit.clone(), Some(cloud), None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(!result.success);
    assert_eq!(result.final_stage, VideoStage::Failed);
    assert!(result.error.as_ref().unwrap().contains("quota exceeded"));
    assert_eq!(toolkit.cut_count(), 0);
}

#[tokio::test]
async fn test_low_success_rate_fails_but_keeps_files() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let mut options = options(dir.path());
    options.merge.enabled = false;
    let toolkit = five_shot_toolkit().with_tiny_shots(&[3, 4]);
    let container = DefaultAppContainer::with_ports(ports(probe(), Arc::new(toolkit), None, None), &options);

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(!result.success);
    assert_eq!(result.final_stage, VideoStage::Failed);
    let validation = result.validation.clone().unwrap();
    assert_eq!(validation.valid, 3);
    assert_eq!(validation.total, 5);
    assert!(!validation.passed);
    assert!(result.error.unwrap().contains("3 of 5"));

    let video_dir = OutputNaming::video_output_dir(&options.output_dir, &video);
    let shots: Vec<_> = files_in(&video_dir).into_iter().filter(|f| f.contains("_shot_")).collect();
    assert_eq!(shots.len(), 5);
    let manifest = OutputNaming::manifest_file(&video_dir, &video);
    assert!(manifest.exists());
}

#[tokio::test]
async fn test_failed_slices_count_against_success_rate() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let options = options(dir.path());
    let toolkit = five_shot_toolkit().with_failing_shots(&[1]);
    let container = DefaultAppContainer::with_ports(ports(probe(), Arc::new(toolkit), None, None), &options);

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    // 4 of 5 sits exactly on the default 80% gate
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.failed_slices, 1);
    assert_eq!(result.clip_count, 4);
    assert_eq!(result.validation.unwrap().total, 5);
}

#[tokio::test]
async fn test_merged_clips_keep_their_slice_weight_in_validation() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let options = options(dir.path());
    let toolkit = five_shot_toolkit().with_failing_shots(&[4]);
    let embedding = Arc::new(MockEmbedding::for_similarities(&[0.95, 0.95, 0.95, 0.10]));
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(toolkit), None, Some(embedding)),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    // Shots 0-3 become two merged clips; 4 of 5 slices are still valid
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.failed_slices, 1);
    assert_eq!(result.clip_count, 2);
    let validation = result.validation.unwrap();
    assert_eq!((validation.valid, validation.total), (4, 5));
    assert!(validation.passed);
}

#[tokio::test]
async fn test_directory_is_not_a_video() {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("trip.mp4");
    std::fs::create_dir_all(&folder).unwrap();
    let options = options(dir.path());
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), None, None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&folder, &options).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("File not found"));
}

#[tokio::test]
async fn test_unprobeable_video_fails_in_local_mode() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "mystery.mp4");
    let options = options(dir.path());
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(MockToolkit::default()), None, None),
        &options,
    );

    let result = container.pipeline_interactor().process_video(&video, &options).await;

    assert!(!result.success);
    assert_eq!(result.shot_count, 0);
    assert!(result.manifest_path.is_none());
}

#[tokio::test]
async fn test_raw_boundaries_use_uniform_segments() {
    let dir = TempDir::new().unwrap();
    let video = source_video(dir.path(), "trip.mp4");
    let mut options = options(dir.path());
    options.detection.preserve_raw_boundaries = true;
    options.merge.enabled = false;
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), None, None),
        &options,
    );

    let shots = container.detect_interactor().detect(&video, &options.detection).await;

    assert!(!shots.is_empty());
    assert!(shots.iter().all(|s| s.kind == ShotKind::Uniform));
    assert_eq!(shots.last().unwrap().end_time, 15.0);
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let first = source_video(dir.path(), "trip.mp4");
    let second = source_video(dir.path(), "beach.mp4");
    let missing = dir.path().join("gone.mp4");
    let options = options(dir.path());
    let probe = probe().with("beach.mp4", 9.0);
    let toolkit = five_shot_toolkit().with_cuts("beach.mp4", &[4.5]);
    let container = DefaultAppContainer::with_ports(ports(probe, Arc::new(toolkit), None, None), &options);

    let report = container
        .batch_interactor()
        .process_batch(vec![first, second, missing.clone()], &options, 2)
        .await;

    assert_eq!(report.total_videos, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total_slices, 5 + 2);
    assert!(report.finished_at.is_some());
    assert!(!report.all_succeeded());

    let errors = report.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, missing);

    let report_path = options.output_dir.join(RUN_REPORT_FILE_NAME);
    assert_eq!(report.manifest_path.as_ref(), Some(&report_path));
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path).unwrap()).unwrap();
    assert_eq!(json["totalVideos"], 3);
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_batch_keeps_same_named_videos_apart() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("a")).unwrap();
    std::fs::create_dir_all(dir.path().join("b")).unwrap();
    let first = source_video(&dir.path().join("a"), "trip.mp4");
    let second = source_video(&dir.path().join("b"), "trip.mp4");
    let options = options(dir.path());
    let embedding = Arc::new(MockEmbedding::for_similarities(&[0.95, 0.95, 0.10, 0.95]));
    let container = DefaultAppContainer::with_ports(
        ports(probe(), Arc::new(five_shot_toolkit()), None, Some(embedding)),
        &options,
    );

    let report = container
        .batch_interactor()
        .process_batch(vec![first.clone(), second.clone()], &options, 2)
        .await;

    assert_eq!(report.succeeded, 2, "{:?}", report.errors());
    let manifest_of = |video: &std::path::Path| {
        report
            .results
            .iter()
            .find(|r| r.video_path == video)
            .and_then(|r| r.manifest_path.clone())
            .unwrap()
    };
    let first_manifest = manifest_of(&first);
    let second_manifest = manifest_of(&second);
    assert_ne!(first_manifest, second_manifest);
    assert_eq!(first_manifest.parent().unwrap(), options.output_dir.join("trip"));
    assert_eq!(second_manifest.parent().unwrap(), options.output_dir.join("trip_2"));

    for manifest in [&first_manifest, &second_manifest] {
        let video_dir = manifest.parent().unwrap();
        let files = files_in(video_dir);
        assert!(files.iter().any(|f| f == "trip_merged_000_002.mp4"), "{:?}", files);
        assert!(files.iter().any(|f| f == "trip_merged_003_004.mp4"), "{:?}", files);
        assert_eq!(files_in(&OutputNaming::backup_dir(video_dir)).len(), 5);
    }
}
