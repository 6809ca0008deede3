//! Rate limiter for repetitive log lines.
//!
//! A misconfigured filter can fail on every notification. Logging each
//! occurrence would flood the output, so the listener logs the first
//! failure per window and a suppressed count when the window rolls over.

use std::time::{Duration, Instant};

/// Allows one log line per window, counting suppressed attempts.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    last: Option<Instant>,
    suppressed: u64,
}

impl LogThrottle {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            suppressed: 0,
        }
    }

    /// Returns `Some(suppressed)` when a log line should be emitted,
    /// where `suppressed` is the number of attempts swallowed since the
    /// previous emission. Returns `None` when the line should be skipped.
    pub fn check(&mut self) -> Option<u64> {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.window => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}
