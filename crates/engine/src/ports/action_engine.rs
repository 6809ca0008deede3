//! Action engine port — executes an event's configured command list.
//!
//! The engine treats an invocation as an opaque blocking operation that
//! runs to completion or failure; there is no cancellation of an action
//! already in flight.

use std::future::Future;

use sundial_domain::error::SundialError;
use sundial_domain::path::EventPath;
use sundial_domain::payload::EventPayload;

/// Why an event is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Fired on schedule.
    Scheduled,
    /// Fired on a matching bus notification.
    Triggered,
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => f.write_str("scheduled"),
            Self::Triggered => f.write_str("triggered"),
        }
    }
}

/// Executes an event's command list.
pub trait ActionEngine {
    /// Run the operations configured for the event at `path`.
    ///
    /// For triggered invocations `payload` carries the matched
    /// notification's fields as a read-only runtime value.
    fn invoke(
        &self,
        path: &EventPath,
        invocation: Invocation,
        payload: Option<&EventPayload>,
    ) -> impl Future<Output = Result<(), SundialError>> + Send;
}

impl<T: ActionEngine + Send + Sync> ActionEngine for std::sync::Arc<T> {
    fn invoke(
        &self,
        path: &EventPath,
        invocation: Invocation,
        payload: Option<&EventPayload>,
    ) -> impl Future<Output = Result<(), SundialError>> + Send {
        (**self).invoke(path, invocation, payload)
    }
}
