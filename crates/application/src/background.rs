//! Detached task tracking
//!
//! Post-response scripts and history writes run detached from the
//! execution that started them. They are still tracked here so tests and
//! shutdown can wait for them.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

/// A set of detached tasks that only [`BackgroundTasks::drain`] joins.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the runtime and tracks it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, "spawning background task");
        let handle = tokio::spawn(task);
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Number of tracked tasks that have not finished yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Waits until every tracked task, including tasks spawned while
    /// draining, has finished. Panicked tasks are logged.
    pub async fn drain(&self) {
        loop {
            let batch = std::mem::take(
                &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(error) = handle.await {
                    tracing::warn!(%error, "background task did not complete");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_nested_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_tasks = tasks.clone();
        let inner_done = Arc::clone(&done);
        tasks.spawn("outer", async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let nested_done = Arc::clone(&inner_done);
            inner_tasks.spawn("inner", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                nested_done.fetch_add(1, Ordering::SeqCst);
            });
            inner_done.fetch_add(1, Ordering::SeqCst);
        });

        tasks.drain().await;

        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_drain() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("panics", async { panic!("boom") });
        tasks.spawn("fine", async {});
        tasks.drain().await;
        assert_eq!(tasks.pending(), 0);
    }
}
