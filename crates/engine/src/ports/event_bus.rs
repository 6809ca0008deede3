//! Notification bus port.
//!
//! Adapters (device drivers, monitors, test fixtures) publish
//! [`Notification`]s; the engine's listener subscribes and evaluates
//! triggered-event filters against them.

use sundial_domain::payload::Notification;

/// Sink for publishing notifications onto the engine's bus.
pub trait NotificationPublisher: Send + Sync {
    /// Publish a notification. Delivery is best-effort fan-out; a bus
    /// with no subscribers silently drops the notification.
    fn publish(&self, notification: Notification);
}

impl<T: NotificationPublisher> NotificationPublisher for std::sync::Arc<T> {
    fn publish(&self, notification: Notification) {
        self.as_ref().publish(notification);
    }
}
