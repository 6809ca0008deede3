//! Supervision of event-monitor tasks.
//!
//! Each active monitor is backed by exactly one long-running task. The
//! supervisor owns the handles, starts and stops tasks in lock-step with
//! the monitor's `paused` flag, and tears everything down on shutdown.

use std::collections::HashMap;
use std::time::Duration;

use sundial_domain::error::SundialError;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;

use crate::ports::{MonitorHandle, MonitorRuntime};

pub struct MonitorSupervisor<M> {
    runtime: M,
    handles: tokio::sync::Mutex<HashMap<String, MonitorHandle>>,
    stop_timeout: Duration,
}

impl<M: MonitorRuntime> MonitorSupervisor<M> {
    #[must_use]
    pub fn new(runtime: M, stop_timeout: Duration) -> Self {
        Self {
            runtime,
            handles: tokio::sync::Mutex::new(HashMap::new()),
            stop_timeout,
        }
    }

    /// Start the task backing a monitor. A paused monitor is left alone;
    /// a monitor that already has a running task is restarted.
    ///
    /// # Errors
    ///
    /// Propagates the runtime's startup failure; the caller is expected
    /// to mark the monitor failed in the registry.
    pub async fn start(&self, monitor: &EventMonitor) -> Result<(), SundialError> {
        if monitor.paused {
            return Ok(());
        }
        let handle = self.runtime.start(monitor).await?;
        let previous = {
            let mut handles = self.handles.lock().await;
            handles.insert(monitor.path.key(), handle)
        };
        if let Some(previous) = previous {
            previous.stop(self.stop_timeout).await;
        }
        tracing::debug!(path = %monitor.path, "monitor started");
        Ok(())
    }

    /// Stop a monitor's task if one is running.
    pub async fn stop(&self, path: &EventPath) {
        let handle = {
            let mut handles = self.handles.lock().await;
            handles.remove(&path.key())
        };
        if let Some(handle) = handle {
            handle.stop(self.stop_timeout).await;
            tracing::debug!(%path, "monitor stopped");
        }
    }

    /// Re-key a running task after its monitor was renamed. The task
    /// keeps running; only the supervisor's index changes.
    pub async fn rename(&self, old: &EventPath, new: &EventPath) {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.remove(&old.key()) {
            handles.insert(new.key(), handle);
        }
    }

    /// Whether a task is currently running for the path.
    pub async fn is_running(&self, path: &EventPath) -> bool {
        self.handles.lock().await.contains_key(&path.key())
    }

    /// Stop every running task. Part of engine shutdown; a task that
    /// ignores its shutdown signal is aborted after the timeout.
    pub async fn stop_all(&self) {
        let handles = {
            let mut handles = self.handles.lock().await;
            std::mem::take(&mut *handles)
        };
        for (key, handle) in handles {
            handle.stop(self.stop_timeout).await;
            tracing::debug!(path = %key, "monitor stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use sundial_domain::error::SundialError;
    use sundial_domain::monitor::EventMonitor;
    use sundial_domain::path::EventPath;

    use crate::ports::{MonitorHandle, MonitorRuntime};

    use super::MonitorSupervisor;

    #[derive(Default)]
    struct FakeRuntime {
        started: AtomicUsize,
        fail: bool,
    }

    impl MonitorRuntime for FakeRuntime {
        async fn start(&self, _monitor: &EventMonitor) -> Result<MonitorHandle, SundialError> {
            if self.fail {
                return Err(SundialError::Engine("boom".to_string()));
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
            let task = tokio::spawn(async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            });
            Ok(MonitorHandle::new(shutdown_tx, task))
        }
    }

    fn monitor(raw: &str) -> EventMonitor {
        EventMonitor::new(EventPath::parse(raw).unwrap(), serde_json::json!({}))
    }

    fn supervisor(runtime: Arc<FakeRuntime>) -> MonitorSupervisor<Arc<FakeRuntime>> {
        MonitorSupervisor::new(runtime, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn should_start_and_stop_monitor_task() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(Arc::clone(&runtime));
        supervisor.start(&monitor("/m/a")).await.unwrap();
        assert!(supervisor.is_running(&EventPath::parse("/m/a").unwrap()).await);
        supervisor.stop(&EventPath::parse("/m/a").unwrap()).await;
        assert!(!supervisor.is_running(&EventPath::parse("/m/a").unwrap()).await);
        assert_eq!(runtime.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_not_start_paused_monitor() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(Arc::clone(&runtime));
        let mut paused = monitor("/m/a");
        paused.paused = true;
        supervisor.start(&paused).await.unwrap();
        assert!(!supervisor.is_running(&paused.path).await);
        assert_eq!(runtime.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_propagate_startup_failure() {
        let runtime = Arc::new(FakeRuntime {
            fail: true,
            ..FakeRuntime::default()
        });
        let supervisor = supervisor(Arc::clone(&runtime));
        let result = supervisor.start(&monitor("/m/a")).await;
        assert!(result.is_err());
        assert!(!supervisor.is_running(&EventPath::parse("/m/a").unwrap()).await);
    }

    #[tokio::test]
    async fn should_rekey_running_task_on_rename() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(Arc::clone(&runtime));
        supervisor.start(&monitor("/m/old")).await.unwrap();
        supervisor
            .rename(
                &EventPath::parse("/m/old").unwrap(),
                &EventPath::parse("/m/new").unwrap(),
            )
            .await;
        assert!(!supervisor.is_running(&EventPath::parse("/m/old").unwrap()).await);
        assert!(supervisor.is_running(&EventPath::parse("/m/new").unwrap()).await);
        supervisor.stop_all().await;
    }

    #[tokio::test]
    async fn should_stop_all_tasks_on_shutdown() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(Arc::clone(&runtime));
        supervisor.start(&monitor("/m/a")).await.unwrap();
        supervisor.start(&monitor("/m/b")).await.unwrap();
        supervisor.stop_all().await;
        assert!(!supervisor.is_running(&EventPath::parse("/m/a").unwrap()).await);
        assert!(!supervisor.is_running(&EventPath::parse("/m/b").unwrap()).await);
    }
}
