//! Output naming for slices, merged clips, manifests and backups

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Subdirectory that receives originals retired by a merge
pub const BACKUP_DIR_NAME: &str = "backup_before_merge";

/// File name of the batch-level run report
pub const RUN_REPORT_FILE_NAME: &str = "run_report.json";

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];

/// Deterministic output paths derived from the source video name
pub struct OutputNaming;

impl OutputNaming {
    /// File stem with anything outside [A-Za-z0-9_-] replaced by '_'
    pub fn video_stem(video: &Path) -> String {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let cleaned: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if cleaned.is_empty() {
            "video".to_string()
        } else {
            cleaned
        }
    }

    /// Lower-cased source extension, `mp4` when missing
    pub fn extension(video: &Path) -> String {
        video
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "mp4".to_string())
    }

    pub fn video_output_dir(output_root: &Path, video: &Path) -> PathBuf {
        output_root.join(Self::video_stem(video))
    }

    /// One output directory per video, in input order. Videos whose cleaned stems
    /// collide (case-insensitively) get `_2`, `_3`, ... in the order they appear.
    pub fn unique_output_dirs(output_root: &Path, videos: &[PathBuf]) -> Vec<PathBuf> {
        let mut taken = HashSet::new();
        videos
            .iter()
            .map(|video| {
                let stem = Self::video_stem(video);
                let mut name = stem.clone();
                let mut suffix = 2;
                while !taken.insert(name.to_lowercase()) {
                    name = format!("{}_{}", stem, suffix);
                    suffix += 1;
                }
                output_root.join(name)
            })
            .collect()
    }

    pub fn shot_file(dir: &Path, video: &Path, index: usize) -> PathBuf {
        dir.join(format!(
            "{}_shot_{:03}.{}",
            Self::video_stem(video),
            index,
            Self::extension(video)
        ))
    }

    /// Re-encoded output is always H.264 in an MP4 container
    pub fn merged_file(dir: &Path, video: &Path, first_index: usize, last_index: usize) -> PathBuf {
        dir.join(format!(
            "{}_merged_{:03}_{:03}.mp4",
            Self::video_stem(video),
            first_index,
            last_index
        ))
    }

    pub fn manifest_file(dir: &Path, video: &Path) -> PathBuf {
        dir.join(format!("{}_manifest.json", Self::video_stem(video)))
    }

    pub fn backup_dir(dir: &Path) -> PathBuf {
        dir.join(BACKUP_DIR_NAME)
    }

    pub fn is_video_file(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map_or(false, |ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }
}
