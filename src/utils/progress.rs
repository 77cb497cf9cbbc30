//! Lock-guarded progress counter shared by pool workers

use std::sync::{Arc, Mutex};

use tracing::info;

/// Snapshot of a counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressState {
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            self.finished() as f32 / self.total as f32 * 100.0
        }
    }
}

/// Progress tracker with thread-safe updates
#[derive(Clone)]
pub struct ProgressCounter {
    label: Arc<str>,
    inner: Arc<Mutex<ProgressState>>,
}

impl ProgressCounter {
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        let label: String = label.into();
        Self {
            label: Arc::from(label),
            inner: Arc::new(Mutex::new(ProgressState {
                total,
                ..ProgressState::default()
            })),
        }
    }

    pub fn record_success(&self) -> ProgressState {
        self.update(|state| state.completed += 1)
    }

    pub fn record_failure(&self) -> ProgressState {
        self.update(|state| state.failed += 1)
    }

    pub fn snapshot(&self) -> ProgressState {
        *self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, apply: impl FnOnce(&mut ProgressState)) -> ProgressState {
        let state = {
            let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            apply(&mut guard);
            *guard
        };
        info!(
            task = %self.label,
            done = state.finished(),
            total = state.total,
            failed = state.failed,
            "{:.0}% complete",
            state.percent()
        );
        state
    }
}
