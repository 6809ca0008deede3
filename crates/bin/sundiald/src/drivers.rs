//! Built-in adapter implementations for the daemon.
//!
//! The real controller plugs device-specific integrations into the
//! engine's ports. The daemon ships two built-ins: an action engine
//! that logs each invocation, and a monitor runtime whose tasks publish
//! periodic heartbeat notifications onto the bus so triggered events
//! can react to them.

use sundial_domain::error::SundialError;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;
use sundial_domain::payload::{EventPayload, Notification};
use sundial_engine::event_bus::EventBus;
use sundial_engine::ports::{
    ActionEngine, Invocation, MonitorHandle, MonitorRuntime, NotificationPublisher,
};

/// Logs every invocation instead of running a command list.
pub struct LoggingActionEngine;

impl ActionEngine for LoggingActionEngine {
    async fn invoke(
        &self,
        path: &EventPath,
        invocation: Invocation,
        payload: Option<&EventPayload>,
    ) -> Result<(), SundialError> {
        match payload {
            Some(payload) if !payload.is_empty() => {
                let fields: Vec<String> = payload
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                tracing::info!(%path, %invocation, fields = fields.join(" "), "event invoked");
            }
            _ => tracing::info!(%path, %invocation, "event invoked"),
        }
        Ok(())
    }
}

/// Runs each monitor as a heartbeat publisher.
pub struct HeartbeatMonitorRuntime {
    bus: EventBus,
}

impl HeartbeatMonitorRuntime {
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl MonitorRuntime for HeartbeatMonitorRuntime {
    async fn start(&self, monitor: &EventMonitor) -> Result<MonitorHandle, SundialError> {
        let poll_secs = match monitor.config.get("poll_secs") {
            None => 30,
            Some(value) => value.as_u64().filter(|secs| *secs > 0).ok_or_else(|| {
                SundialError::Engine(format!(
                    "monitor {} requires a positive numeric poll_secs",
                    monitor.path,
                ))
            })?,
        };
        let bus = self.bus.clone();
        let path = monitor.path.clone();
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(poll_secs));
            // skip the immediate first tick
            ticker.tick().await;
            let mut beats: u64 = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        beats += 1;
                        bus.publish(Notification::new(
                            Some(path.clone()),
                            EventPayload::new().with("heartbeat", beats),
                        ));
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(%path, "monitor heartbeat stopped");
        });
        Ok(MonitorHandle::new(shutdown_tx, task))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sundial_domain::monitor::EventMonitor;
    use sundial_domain::path::EventPath;
    use sundial_engine::event_bus::EventBus;
    use sundial_engine::ports::MonitorRuntime;

    use super::HeartbeatMonitorRuntime;

    fn monitor(config: serde_json::Value) -> EventMonitor {
        EventMonitor::new(EventPath::parse("/monitors/heartbeat").unwrap(), config)
    }

    #[tokio::test]
    async fn should_reject_non_numeric_poll_interval() {
        let runtime = HeartbeatMonitorRuntime::new(EventBus::new(8));
        let result = runtime
            .start(&monitor(serde_json::json!({"poll_secs": "fast"})))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_reject_zero_poll_interval() {
        let runtime = HeartbeatMonitorRuntime::new(EventBus::new(8));
        let result = runtime
            .start(&monitor(serde_json::json!({"poll_secs": 0})))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_publish_heartbeats_until_stopped() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let runtime = HeartbeatMonitorRuntime::new(bus);
        let handle = runtime
            .start(&monitor(serde_json::json!({"poll_secs": 1})))
            .await
            .unwrap();

        let notification = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("heartbeat should arrive")
            .unwrap();
        assert_eq!(
            notification.source.unwrap(),
            EventPath::parse("/monitors/heartbeat").unwrap()
        );
        assert!(notification.payload.get("heartbeat").is_some());

        handle.stop(Duration::from_secs(1)).await;
    }
}
