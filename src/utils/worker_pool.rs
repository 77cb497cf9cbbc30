//! Fixed-width worker pool used at both the video and the slice level

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// A unit of work that never produced a result
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkerError {
    #[error("worker task aborted: {0}")]
    Aborted(String),
}

/// Run `task` over every item with at most `width` running at once.
///
/// Results come back in input order. A task that panicked is reported as
/// [`WorkerError::Aborted`] and does not affect its siblings.
pub async fn run_bounded<T, R, F, Fut>(width: usize, items: Vec<T>, task: F) -> Vec<Result<R, WorkerError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(width.max(1)));
    let task = Arc::new(task);
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let task = Arc::clone(&task);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, task(item).await)
        });
    }

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    let mut last_abort = String::from("worker task did not complete");
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, value)) => slots[index] = Some(value),
            Err(err) => {
                error!(error = %err, "Worker task aborted");
                last_abort = err.to_string();
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| WorkerError::Aborted(last_abort.clone())))
        .collect()
}
