//! Deferred restart task.

use std::future::Future;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};

/// Handle to a pending one-shot restart.
///
/// Dropping the handle detaches the task; it still fires.
#[derive(Debug)]
pub struct RestartHandle {
    task: JoinHandle<()>,
}

impl RestartHandle {
    /// Run `on_fire` once `after` has elapsed.
    pub(crate) fn spawn<F>(after: Duration, on_fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_fire.await;
        });
        Self { task }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    /// Wait for the task; `true` if the restart fired, `false` if cancelled.
    pub async fn wait(self) -> bool {
        self.task.await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = RestartHandle::spawn(Duration::from_secs(10), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));

        assert!(handle.wait().await);
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_restart_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = RestartHandle::spawn(Duration::from_secs(10), async move {
            flag.store(true, Ordering::SeqCst);
        });

        handle.cancel();
        assert!(!handle.wait().await);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
