//! Event monitor — a continuously running supervised watcher definition.
//!
//! Monitors are not dispatch-fired: each active monitor is backed by one
//! long-running task owned by the monitor runtime. The configuration blob
//! is opaque to the scheduler.

use serde::{Deserialize, Serialize};

use crate::error::SundialError;
use crate::path::EventPath;

/// A continuously running watcher definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMonitor {
    pub path: EventPath,
    /// Opaque configuration owned by the monitor runtime.
    pub config: serde_json::Value,
    pub paused: bool,
    /// Set when the backing task failed during startup. A failed monitor
    /// stays paused and is not auto-restarted.
    pub failed: bool,
    /// Global change serial stamped at the last mutation.
    pub version: u64,
}

impl EventMonitor {
    /// Create a monitor definition, not paused and not failed.
    #[must_use]
    pub fn new(path: EventPath, config: serde_json::Value) -> Self {
        Self {
            path,
            config,
            paused: false,
            failed: false,
            version: 0,
        }
    }

    /// Check domain invariants. The configuration blob is opaque here, so
    /// only path validity (enforced by the type) applies.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept for symmetry with the other definitions
    /// so the admin layer validates every kind the same way.
    pub fn validate(&self) -> Result<(), SundialError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_active_and_not_failed() {
        let monitor = EventMonitor::new(
            EventPath::parse("/monitors/water-leak").unwrap(),
            serde_json::json!({"poll_secs": 5}),
        );
        assert!(!monitor.paused);
        assert!(!monitor.failed);
        assert_eq!(monitor.version, 0);
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let monitor = EventMonitor::new(
            EventPath::parse("/monitors/water-leak").unwrap(),
            serde_json::json!({"poll_secs": 5}),
        );
        let json = serde_json::to_string(&monitor).unwrap();
        let parsed: EventMonitor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.path, monitor.path);
        assert_eq!(parsed.config, monitor.config);
    }
}
