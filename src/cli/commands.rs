//! Command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::adapters::toml_config::PipelineOptions;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::cli::args::{DetectArgs, RunArgs};
use crate::domain::model::{AnalysisMode, RunReport, ShotInterval};
use crate::error::SceneSplitError;
use crate::utils::path::OutputNaming;
use crate::utils::Utils;

/// Resolve options following precedence: CLI > Env > File > Defaults
pub fn resolve_options(args: &RunArgs) -> Result<PipelineOptions> {
    let mut options = PipelineOptions::discover(args.config.as_deref())?;
    options.apply_env()?;
    apply_cli_overrides(&mut options, args)?;
    options.validate()?;
    Ok(options)
}

/// Apply CLI argument overrides to the options bundle
pub fn apply_cli_overrides(options: &mut PipelineOptions, args: &RunArgs) -> Result<usize> {
    let mut overrides = 0;

    if let Some(output) = &args.output {
        options.output_dir = output.clone();
        overrides += 1;
    }
    if let Some(mode) = &args.mode {
        options.analysis_mode = AnalysisMode::parse(mode)?;
        overrides += 1;
    }
    if let Some(width) = args.max_videos {
        options.concurrency.max_concurrent_videos = width;
        overrides += 1;
    }
    if let Some(width) = args.slice_workers {
        options.concurrency.slice_workers = width;
        overrides += 1;
    }
    if let Some(threshold) = args.threshold {
        options.merge.similarity_threshold = threshold;
        overrides += 1;
    }
    if let Some(seconds) = args.max_merge_duration {
        options.merge.max_merge_duration = seconds;
        overrides += 1;
    }
    if args.no_merge {
        options.merge.enabled = false;
        overrides += 1;
    }
    if let Some(seconds) = args.min_shot_duration {
        options.detection.min_shot_duration = seconds;
        overrides += 1;
    }
    if let Some(sensitivity) = args.sensitivity {
        options.detection.sensitivity = sensitivity;
        overrides += 1;
    }
    if args.preserve_raw_boundaries {
        options.detection.preserve_raw_boundaries = true;
        overrides += 1;
    }
    if let Some(endpoint) = &args.cloud_endpoint {
        options.cloud.endpoint = Some(endpoint.clone());
        overrides += 1;
    }
    if let Some(endpoint) = &args.embedding_endpoint {
        options.embedding.endpoint = Some(endpoint.clone());
        overrides += 1;
    }

    if overrides > 0 {
        info!("Applied {} CLI configuration overrides", overrides);
    }
    Ok(overrides)
}

/// Expand files and directories into a sorted, de-duplicated list of videos
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, SceneSplitError> {
    let mut videos = Vec::new();
    for input in inputs {
        if input.is_file() {
            videos.push(input.clone());
        } else if input.is_dir() {
            for entry in WalkDir::new(input).follow_links(true) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && OutputNaming::is_video_file(entry.path()) => {
                        videos.push(entry.into_path())
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Skipping unreadable directory entry"),
                }
            }
        } else {
            return Err(SceneSplitError::NoInputs {
                path: input.display().to_string(),
            });
        }
    }

    videos.sort();
    videos.dedup();
    if videos.is_empty() {
        let joined = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(SceneSplitError::NoInputs { path: joined });
    }
    Ok(videos)
}

/// Execute the run command
pub async fn run(args: RunArgs) -> Result<()> {
    let options = resolve_options(&args).context("Failed to resolve configuration")?;
    let videos = collect_inputs(&args.input)?;
    info!(
        videos = videos.len(),
        output = %options.output_dir.display(),
        mode = %options.analysis_mode,
        "Starting run"
    );

    let container = DefaultAppContainer::new(&options).context("Failed to initialize adapters")?;
    let report = container
        .batch_interactor()
        .process_batch(videos, &options, options.concurrency.max_concurrent_videos)
        .await;

    display_report(&report);
    if report.all_succeeded() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} videos failed",
            report.failed,
            report.total_videos
        ))
    }
}

/// Execute the detect command
pub async fn detect(args: DetectArgs) -> Result<()> {
    if !Path::new(&args.input).is_file() {
        return Err(anyhow::anyhow!("Input file does not exist: {}", args.input.display()));
    }

    let mut options = PipelineOptions::discover(args.config.as_deref())?;
    options.apply_env()?;
    if let Some(sensitivity) = args.sensitivity {
        options.detection.sensitivity = sensitivity;
    }
    options.validate()?;

    let container = DefaultAppContainer::new(&options).context("Failed to initialize adapters")?;
    let shots = container
        .detect_interactor()
        .detect(&args.input, &options.detection)
        .await;
    if shots.is_empty() {
        return Err(anyhow::anyhow!("No shots detected in {}", args.input.display()));
    }

    if args.json {
        let json = serde_json::to_string_pretty(&shots).context("Failed to serialize shots to JSON")?;
        println!("{}", json);
    } else {
        display_shots(&shots);
    }
    Ok(())
}

fn display_shots(shots: &[ShotInterval]) {
    println!("{:>5}  {:>10}  {:>10}  {:>8}  {:>5}  kind", "shot", "start", "end", "length", "conf");
    for shot in shots {
        println!(
            "{:>5}  {:>10.3}  {:>10.3}  {:>8.3}  {:>5.2}  {:?}",
            shot.index, shot.start_time, shot.end_time, shot.duration, shot.confidence, shot.kind
        );
    }
}

fn display_report(report: &RunReport) {
    println!("Videos:    {} ({} ok, {} failed)", report.total_videos, report.succeeded, report.failed);
    println!("Clips:     {}", report.total_slices);
    println!(
        "Elapsed:   {}",
        Utils::format_duration(std::time::Duration::from_millis(report.elapsed_ms))
    );
    if let Some(path) = &report.manifest_path {
        println!("Report:    {}", path.display());
    }
    for (video, error) in report.errors() {
        println!("  FAILED {}: {}", video.display(), error);
    }
}
