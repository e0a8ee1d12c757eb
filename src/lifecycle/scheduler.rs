//! Cancellable deferred work.
//!
//! A [`ScheduledTask`] is a spawned tokio task that optionally sleeps before
//! running its body, plus the handle needed to cancel it. The controller keeps
//! at most one poll task and one upload task; superseding a job cancels both.
//! Dropping a `ScheduledTask` does *not* cancel it, so a running poll can
//! replace its own slot with the next poll without aborting itself.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `body`, running it after `delay` when one is given.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(delay: Option<Duration>, body: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            body.await;
        });
        Self { handle }
    }

    /// Abort the task. A task already past its last `.await` still finishes.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn runs_after_delay() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let task = ScheduledTask::spawn(Some(Duration::from_secs(2)), async move {
            h.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let task = ScheduledTask::spawn(Some(Duration::from_secs(2)), async move {
            h.fetch_add(1, Ordering::SeqCst);
        });
        task.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_does_not_cancel() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        drop(ScheduledTask::spawn(None, async move {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
