//! Trigger listener — filter evaluation against bus notifications.
//!
//! The listener consumes the broadcast subscription and, for each
//! notification, evaluates every non-paused triggered event's filter.
//! One filter's runtime failure never aborts the others; such failures
//! are logged through a rate limiter so a persistently bad filter cannot
//! flood the logs. A lagged subscription (slow consumer) skips ahead and
//! is logged with the number of missed notifications.

use std::sync::Arc;
use std::time::Duration;

use sundial_domain::filter::FilterContext;
use sundial_domain::payload::Notification;
use sundial_domain::solar::is_night;
use sundial_domain::work_item::WorkItem;
use tokio::sync::{broadcast, mpsc, watch};

use crate::registry::Registry;
use crate::stats::EngineStats;
use crate::throttle::LogThrottle;

const FILTER_ERROR_LOG_WINDOW: Duration = Duration::from_secs(30);

pub(crate) struct Listener {
    registry: Arc<Registry>,
    work_tx: mpsc::Sender<WorkItem>,
    stats: Arc<EngineStats>,
    shutdown: watch::Receiver<bool>,
    throttle: LogThrottle,
}

impl Listener {
    pub(crate) fn new(
        registry: Arc<Registry>,
        work_tx: mpsc::Sender<WorkItem>,
        stats: Arc<EngineStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            work_tx,
            stats,
            shutdown,
            throttle: LogThrottle::new(FILTER_ERROR_LOG_WINDOW),
        }
    }

    pub(crate) async fn run(mut self, mut notifications: broadcast::Receiver<Notification>) {
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
                received = notifications.recv() => match received {
                    Ok(notification) => {
                        if !self.evaluate(notification).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "listener lagged behind the bus, notifications missed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!("listener exited");
    }

    /// Evaluate every triggered event against one notification. Returns
    /// `false` when the dispatcher is gone and the listener should stop.
    async fn evaluate(&mut self, notification: Notification) -> bool {
        let location = self.registry.location();
        let now = sundial_domain::time::now();
        let ctx = FilterContext {
            payload: &notification.payload,
            night: is_night(now, location),
            now,
        };
        for event in self.registry.triggered_events() {
            if event.paused {
                continue;
            }
            match event.filter.matches(&ctx) {
                Ok(true) => {
                    self.stats.record_matched();
                    if event.loggable {
                        tracing::debug!(path = %event.path, "notification matched trigger");
                    }
                    let item = WorkItem::triggered(&event, &notification.payload);
                    if self.work_tx.send(item).await.is_err() {
                        return false;
                    }
                }
                Ok(false) => {}
                Err(error) => {
                    if let Some(suppressed) = self.throttle.check() {
                        tracing::warn!(
                            path = %event.path,
                            %error,
                            suppressed,
                            "filter evaluation failed",
                        );
                    }
                }
            }
        }
        true
    }
}
