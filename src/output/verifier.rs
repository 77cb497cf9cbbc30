//! Output verification: the success-rate gate over materialized clips

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::model::{Clip, ValidationSummary};
use crate::domain::rules::ValidationPolicy;
use crate::ports::FsPort;
use crate::utils::Utils;

/// Checks that final clips exist and reach the minimum size
#[derive(Clone)]
pub struct OutputVerifier {
    fs_port: Arc<dyn FsPort>,
}

impl OutputVerifier {
    pub fn new(fs_port: Arc<dyn FsPort>) -> Self {
        Self { fs_port }
    }

    /// Valid slices over all slices. A consolidated clip stands for every shot it
    /// replaced; slices that were never produced count as invalid.
    pub async fn verify(&self, clips: &[Clip], failed_slices: usize, policy: &ValidationPolicy) -> ValidationSummary {
        let mut valid = 0;
        let mut total = failed_slices;
        for clip in clips {
            let weight = slice_weight(clip);
            total += weight;
            let size = match self.fs_port.file_size(&clip.file_path).await {
                Ok(size) => size,
                Err(e) => {
                    warn!(clip = %clip.file_path.display(), error = %e, "Cannot stat clip");
                    None
                }
            };
            if policy.is_valid_slice(size) {
                valid += weight;
            } else {
                debug!(
                    clip = %clip.file_path.display(),
                    size = %size.map(Utils::format_file_size).unwrap_or_else(|| "missing".to_string()),
                    "Clip below size threshold"
                );
            }
        }

        let summary = policy.summarize(valid, total);
        info!(
            valid = summary.valid,
            total = summary.total,
            rate = %format!("{:.1}%", summary.success_rate * 100.0),
            passed = summary.passed,
            "Validation complete"
        );
        summary
    }
}

/// Number of shot slices a final clip accounts for
fn slice_weight(clip: &Clip) -> usize {
    clip.provenance
        .as_ref()
        .map_or(1, |p| p.original_count.max(1))
}
