// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Total duration of the media file in seconds
    async fn probe_duration(&self, file_path: &Path) -> Result<f64, DomainError>;
}

/// Port for the command-line media toolkit (scene scoring, cutting, frame grabs)
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Per-frame scene-change scores over the whole file
    async fn scene_scores(&self, file_path: &Path) -> Result<Vec<SceneScore>, DomainError>;

    /// Cut [start, start + duration) of the source into the output file
    async fn cut_segment(&self, request: &CutRequest) -> Result<(), DomainError>;

    /// Grab one downscaled RGB frame at each timestamp (seconds from file start)
    async fn extract_frames(
        &self,
        file_path: &Path,
        timestamps: &[f64],
    ) -> Result<Vec<Frame>, DomainError>;
}

/// Port for the remote shot-analysis service
#[async_trait]
pub trait CloudAnalyzerPort: Send + Sync {
    /// Ask the service for shot intervals. Transport failures are errors; a reachable
    /// service that could not analyze the video reports `success == false`.
    async fn analyze(&self, video_path: &Path, features: &[String]) -> Result<CloudAnalysis, DomainError>;
}

/// Port for the vision-language embedding model
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// One embedding per input frame
    async fn embed(&self, frames: &[Frame]) -> Result<Vec<Vec<f32>>, DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// File size in bytes, `None` when the file does not exist
    async fn file_size(&self, file_path: &Path) -> Result<Option<u64>, DomainError>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, dir_path: &Path) -> Result<(), DomainError>;

    /// Copy file, overwriting the destination
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<(), DomainError>;

    /// Delete file
    async fn delete_file(&self, file_path: &Path) -> Result<(), DomainError>;

    /// Write bytes via a temporary sibling and an atomic rename
    async fn write_atomic(&self, file_path: &Path, contents: &[u8]) -> Result<(), DomainError>;
}
