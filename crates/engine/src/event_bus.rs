//! In-process notification bus.
//!
//! A thin wrapper over a tokio broadcast channel. Publishers never
//! block; slow subscribers observe a lag error and skip ahead.

use sundial_domain::payload::Notification;

use crate::ports::NotificationPublisher;

/// Fan-out bus for [`Notification`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: tokio::sync::broadcast::Sender<Notification>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationPublisher for EventBus {
    fn publish(&self, notification: Notification) {
        // Err means no live subscriber, which is fine.
        let _ = self.sender.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use sundial_domain::payload::{EventPayload, Notification};

    use crate::ports::NotificationPublisher;

    use super::EventBus;

    #[tokio::test]
    async fn should_deliver_to_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Notification::new(None, EventPayload::default()));
        let received = rx.recv().await.unwrap();
        assert!(received.source.is_none());
    }

    #[tokio::test]
    async fn should_not_fail_without_subscribers() {
        let bus = EventBus::new(8);
        bus.publish(Notification::new(None, EventPayload::default()));
    }
}
