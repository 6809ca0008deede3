//! Engine counters.
//!
//! Cheap relaxed atomics bumped from the hot paths; a snapshot is taken
//! for logging and for the admin surface.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counters maintained by the engine components.
#[derive(Debug, Default)]
pub struct EngineStats {
    executed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    matched: AtomicU64,
    scheduled_fired: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Work items whose action completed successfully.
    pub executed: u64,
    /// Work items whose action returned an error or panicked.
    pub failed: u64,
    /// Work items discarded because a queue was full.
    pub dropped: u64,
    /// Notifications that matched at least one triggered-event filter.
    pub matched: u64,
    /// Scheduled events whose firing window was reached.
    pub scheduled_fired: u64,
}

impl EngineStats {
    pub fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scheduled_fired(&self) {
        self.scheduled_fired.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            scheduled_fired: self.scheduled_fired.load(Ordering::Relaxed),
        }
    }
}
