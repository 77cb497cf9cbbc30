//! Manifest and run-report writer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::{RunReport, SliceManifest};
use crate::ports::FsPort;
use crate::utils::path::{OutputNaming, RUN_REPORT_FILE_NAME};

/// Writes JSON artifacts through the filesystem port, atomically
#[derive(Clone)]
pub struct ArtifactWriter {
    fs_port: Arc<dyn FsPort>,
}

impl ArtifactWriter {
    pub fn new(fs_port: Arc<dyn FsPort>) -> Self {
        Self { fs_port }
    }

    /// Write `<video_dir>/<stem>_manifest.json`
    pub async fn write_manifest(
        &self,
        video_dir: &Path,
        video: &Path,
        manifest: &SliceManifest,
    ) -> Result<PathBuf, DomainError> {
        let path = OutputNaming::manifest_file(video_dir, video);
        self.write_json(&path, manifest).await?;
        info!(manifest = %path.display(), clips = manifest.clips.len(), "Manifest written");
        Ok(path)
    }

    /// Write `<output_dir>/run_report.json`
    pub async fn write_run_report(&self, output_dir: &Path, report: &RunReport) -> Result<PathBuf, DomainError> {
        let path = output_dir.join(RUN_REPORT_FILE_NAME);
        self.write_json(&path, report).await?;
        info!(report = %path.display(), videos = report.total_videos, "Run report written");
        Ok(path)
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| DomainError::ProcessingError(format!("Failed to serialize {}: {}", path.display(), e)))?;
        self.fs_port.write_atomic(path, &bytes).await
    }
}
