//! Monitor runtime port.
//!
//! An event monitor is a long-running watcher owned by the engine. The
//! runtime knows how to turn a stored [`EventMonitor`] definition into a
//! live task; the supervisor tracks the returned handles and tears them
//! down on shutdown.

use std::future::Future;
use std::time::Duration;

use sundial_domain::error::SundialError;
use sundial_domain::monitor::EventMonitor;

/// Handle on a running monitor task.
pub struct MonitorHandle {
    shutdown: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
    #[must_use]
    pub fn new(
        shutdown: tokio::sync::watch::Sender<bool>,
        task: tokio::task::JoinHandle<()>,
    ) -> Self {
        Self { shutdown, task }
    }

    /// Signal the monitor to stop and wait for it to exit. Aborts the
    /// task if it has not exited within `timeout`.
    pub async fn stop(mut self, timeout: Duration) {
        let _ = self.shutdown.send(true);
        if tokio::time::timeout(timeout, &mut self.task).await.is_err() {
            self.task.abort();
        }
    }
}

/// Factory for live monitor tasks.
pub trait MonitorRuntime: Send + Sync {
    /// Start a monitor from its definition. Returns a handle the
    /// supervisor uses to stop it later.
    fn start(
        &self,
        monitor: &EventMonitor,
    ) -> impl Future<Output = Result<MonitorHandle, SundialError>> + Send;
}

impl<T: MonitorRuntime> MonitorRuntime for std::sync::Arc<T> {
    fn start(
        &self,
        monitor: &EventMonitor,
    ) -> impl Future<Output = Result<MonitorHandle, SundialError>> + Send {
        self.as_ref().start(monitor)
    }
}
