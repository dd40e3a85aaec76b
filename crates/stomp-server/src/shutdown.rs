//! Graceful shutdown driven by a `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long tracked tasks get to finish once shutdown starts.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the shutdown token handed to the listener and every connection task.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Coordinator with [`DEFAULT_SHUTDOWN_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Coordinator with a custom drain timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            timeout,
        }
    }

    /// Token to pass to tasks that must stop on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal shutdown without waiting.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown, then wait for `tasks` up to the drain timeout.
    /// Returns `false` if the timeout elapsed first; unfinished tasks are aborted.
    pub async fn drain(&self, tasks: Vec<JoinHandle<()>>) -> bool {
        self.shutdown();
        info!(
            task_count = tasks.len(),
            timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            "waiting for tasks to finish"
        );

        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(self.timeout, futures::future::join_all(tasks))
            .await
            .is_ok()
        {
            return true;
        }
        warn!("shutdown timed out after {:?}, aborting remaining tasks", self.timeout);
        for abort in aborts {
            abort.abort();
        }
        false
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
