// Local filesystem adapter - File system operations on the host disk

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

/// Local filesystem adapter
#[derive(Debug, Default, Clone)]
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    pub fn new() -> Self {
        Self
    }

    fn fs_error(action: &str, path: &Path, err: std::io::Error) -> DomainError {
        match err.kind() {
            std::io::ErrorKind::NotFound => DomainError::FileNotFound(path.display().to_string()),
            _ => DomainError::Io(format!("Failed to {} {}: {}", action, path.display(), err)),
        }
    }

    fn persist_atomic(path: PathBuf, contents: Vec<u8>) -> Result<(), DomainError> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent).map_err(|e| Self::fs_error("create", &parent, e))?;

        let mut temp = tempfile::Builder::new()
            .prefix(".scenesplit-")
            .suffix(".tmp")
            .tempfile_in(&parent)
            .map_err(|e| Self::fs_error("create temp file in", &parent, e))?;
        temp.write_all(&contents)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| Self::fs_error("write", temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| Self::fs_error("rename into", &path, e.error))?;
        Ok(())
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn file_size(&self, file_path: &Path) -> Result<Option<u64>, DomainError> {
        match tokio::fs::metadata(file_path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::fs_error("stat", file_path, e)),
        }
    }

    async fn create_directory(&self, dir_path: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(dir_path)
            .await
            .map_err(|e| Self::fs_error("create directory", dir_path, e))
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<(), DomainError> {
        if let Some(parent) = to.parent() {
            self.create_directory(parent).await?;
        }
        let bytes = tokio::fs::copy(from, to)
            .await
            .map_err(|e| Self::fs_error("copy", from, e))?;
        debug!(bytes, "Copied {} -> {}", from.display(), to.display());
        Ok(())
    }

    async fn delete_file(&self, file_path: &Path) -> Result<(), DomainError> {
        tokio::fs::remove_file(file_path)
            .await
            .map_err(|e| Self::fs_error("delete", file_path, e))
    }

    async fn write_atomic(&self, file_path: &Path, contents: &[u8]) -> Result<(), DomainError> {
        let path = file_path.to_path_buf();
        let contents = contents.to_vec();
        tokio::task::spawn_blocking(move || Self::persist_atomic(path, contents))
            .await
            .map_err(|e| DomainError::Io(format!("Atomic write task failed: {}", e)))?
    }
}
