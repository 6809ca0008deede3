//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for next-fire times, notification times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
