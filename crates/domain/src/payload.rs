//! Bus notification payloads — structured key/value fields produced by
//! device integrations.
//!
//! Payloads are immutable once constructed. Every work item derived from
//! one notification carries its own clone, so items never share mutable
//! state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::NotificationId;
use crate::path::EventPath;
use crate::time::Timestamp;

/// Structured fields of a device-originating notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(BTreeMap<String, serde_json::Value>);

impl EventPayload {
    /// Empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Whether the payload has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A device-event notification delivered over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    /// Device or integration path that produced the notification, when known.
    pub source: Option<EventPath>,
    pub payload: EventPayload,
    pub at: Timestamp,
}

impl Notification {
    /// Create a notification stamped with the current time.
    #[must_use]
    pub fn new(source: Option<EventPath>, payload: EventPayload) -> Self {
        Self {
            id: NotificationId::new(),
            source,
            payload,
            at: crate::time::now(),
        }
    }
}
