//! Scoped background task lifecycle.
//!
//! [`TaskGuard`] ties a long-running tokio task to the scope that spawned it.
//! The work receives a `CancellationToken` and is expected to watch it at its
//! suspension points; the guard guarantees the token fires on every exit path
//! of the owning scope:
//!
//! - [`shutdown`](TaskGuard::shutdown) cancels and then waits up to a grace
//!   period for the task to finish. The wait is bounded, not a guaranteed
//!   join: a task that never observes cancellation is left running detached
//!   once the grace period elapses.
//! - `Drop` cancels the token without waiting, covering early returns and
//!   unwinding in the owning scope.
//!
//! A guard goes through `Running -> CancelRequested -> Terminated`, or
//! `-> TimedOut` when the grace period expires first. There is no path back
//! out of the terminal states, and `shutdown` never surfaces an error: the
//! point of teardown is unconditional forward progress.

use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Grace period granted to a cancelled task before it is left behind.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Owns one background task and its cancellation signal.
///
/// There is exactly one task per guard, and the guard is the only owner of
/// the handle; it is not meant to be shared beyond the scope that created it.
pub struct TaskGuard {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    grace: Duration,
}

impl TaskGuard {
    /// Spawns `work` as a background task with the default grace period.
    ///
    /// Returns immediately; the task starts executing concurrently with the
    /// caller. The token handed to `work` is the cancellation signal.
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::with_grace(work, DEFAULT_GRACE)
    }

    /// Spawns `work` with an explicit grace period for shutdown.
    pub fn with_grace<F, Fut>(work: F, grace: Duration) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(work(cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
            grace,
        }
    }

    /// Clone of the task's cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// True once the task has run to completion (for any reason).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancels the task and waits up to the grace period for it to finish.
    ///
    /// Never returns an error: a panic inside the task and an expired grace
    /// period are both absorbed, so teardown cannot mask whatever caused the
    /// scope to exit. An expired grace period leaves the task running
    /// detached.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            match tokio::time::timeout(self.grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) if join_err.is_panic() => {
                    warn!("Background task panicked during shutdown: {}", join_err);
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    warn!(
                        "Background task ignored cancellation for {:?}; leaving it behind",
                        self.grace
                    );
                }
            }
        }
    }
}

impl Drop for TaskGuard {
    /// Exit paths that bypass [`shutdown`](TaskGuard::shutdown) — early
    /// returns, `?`, panics in the owning scope — still deliver the
    /// cancellation signal. No waiting happens here.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use tokio::{
        sync::oneshot,
        time::{sleep, timeout, Instant},
    };

    use super::*;

    #[tokio::test]
    async fn spawn_returns_immediately_and_task_runs() {
        let (tx, rx) = oneshot::channel();

        let guard = TaskGuard::spawn(|_cancel| async move {
            let _ = tx.send(());
        });

        // The task runs concurrently; its message arrives without the guard
        // being awaited.
        timeout(Duration::from_secs(1), rx)
            .await
            .expect("task did not start")
            .unwrap();

        guard.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_delivers_cancellation() {
        let observed = Arc::new(AtomicBool::new(false));
        let seen = observed.clone();

        let guard = TaskGuard::spawn(|cancel| async move {
            cancel.cancelled().await;
            seen.store(true, Ordering::SeqCst);
        });

        guard.shutdown().await;
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drop_delivers_cancellation() {
        let observed = Arc::new(AtomicBool::new(false));
        let seen = observed.clone();

        let guard = TaskGuard::spawn(|cancel| async move {
            cancel.cancelled().await;
            seen.store(true, Ordering::SeqCst);
        });
        let token = guard.cancel_token();

        drop(guard);
        assert!(token.is_cancelled());

        // Drop does not wait, so give the task a moment to observe the token.
        sleep(Duration::from_millis(50)).await;
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_absorbs_task_panic() {
        let guard = TaskGuard::spawn(|_cancel| async move {
            panic!("task blew up");
        });

        // Must complete without propagating the panic.
        guard.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_wait_is_bounded() {
        let grace = Duration::from_millis(100);

        // Work that ignores cancellation for well over the grace period.
        let guard = TaskGuard::with_grace(
            |_cancel| async move {
                sleep(Duration::from_secs(2)).await;
            },
            grace,
        );

        let start = Instant::now();
        guard.shutdown().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= grace);
        assert!(
            elapsed < Duration::from_millis(600),
            "shutdown blocked for {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn cooperative_task_finishes_within_grace() {
        let guard = TaskGuard::with_grace(
            |cancel| async move {
                cancel.cancelled().await;
            },
            Duration::from_secs(5),
        );

        let start = Instant::now();
        guard.shutdown().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn is_finished_tracks_completion() {
        let guard = TaskGuard::spawn(|_cancel| async {});
        sleep(Duration::from_millis(50)).await;
        assert!(guard.is_finished());
        guard.shutdown().await;
    }
}
