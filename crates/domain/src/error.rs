//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SundialError`] via `#[from]`. Storage adapters box their error type
//! into the [`SundialError::Storage`] variant so the domain never depends
//! on a concrete database crate.

use crate::privilege::Privilege;

/// Top-level error for the sundial workspace.
#[derive(Debug, thiserror::Error)]
pub enum SundialError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An entity with the same path already exists.
    #[error("conflict")]
    Conflict(#[from] ConflictError),

    /// The caller's privilege level is insufficient.
    #[error("access denied")]
    AccessDenied(#[from] AccessDeniedError),

    /// A next-fire time could not be computed.
    #[error("schedule error")]
    Schedule(#[from] ScheduleError),

    /// An error from the persistence layer.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An internal engine failure (channel closed, supervision failure).
    #[error("engine error: {0}")]
    Engine(String),
}

/// Domain invariant violations, rejected at add/update time.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The event path is empty or does not start with `/`.
    #[error("event path must be non-empty and start with '/'")]
    InvalidPath,

    /// A scheduled event without a schedule.
    #[error("scheduled event requires a schedule")]
    MissingSchedule,

    /// A triggered event without a filter.
    #[error("triggered event requires a filter")]
    MissingFilter,

    /// A periodic schedule with a zero period would fire continuously.
    #[error("periodic schedule requires a non-zero period")]
    ZeroPeriod,

    /// A time-of-day schedule with no enabled day can never fire.
    #[error("day mask must enable at least one day")]
    EmptyDayMask,

    /// Hour or minute outside the valid range.
    #[error("time of day out of range: {hour}:{minute}")]
    TimeOutOfRange { hour: u8, minute: u8 },

    /// A filter node referenced an empty field name.
    #[error("filter field name must not be empty")]
    EmptyFilterField,

    /// An `all`/`any` filter combinator with no children always
    /// evaluates trivially and is almost certainly a mistake.
    #[error("filter combinator must have at least one child")]
    EmptyFilterCombinator,

    /// A time-range bound that is not `HH:MM`.
    #[error("invalid time range bound: {0}")]
    InvalidTimeBound(String),

    /// Latitude or longitude outside the valid range.
    #[error("coordinates out of range: lat {latitude}, lon {longitude}")]
    CoordinatesOutOfRange { latitude: f64, longitude: f64 },
}

/// A lookup failed because the entity does not exist.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {path}")]
pub struct NotFoundError {
    /// Human-readable entity kind (e.g. `"scheduled event"`).
    pub entity: &'static str,
    /// The path that was looked up.
    pub path: String,
}

/// An add failed because the path is already registered.
#[derive(Debug, thiserror::Error)]
#[error("{entity} already exists: {path}")]
pub struct ConflictError {
    pub entity: &'static str,
    pub path: String,
}

/// The caller's privilege level is below the operation's minimum.
#[derive(Debug, thiserror::Error)]
#[error("operation requires {required}, caller has {actual}")]
pub struct AccessDeniedError {
    pub required: Privilege,
    pub actual: Privilege,
}

/// A schedule's next fire time could not be computed.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// No enabled day matched within a full week.
    #[error("no enabled day within the next 7 days")]
    NoEnabledDay,

    /// No solar event occurred within the search horizon (permanent
    /// polar day or night at the configured coordinates).
    #[error("no {event} within the next 366 days at the configured location")]
    NoSolarEvent { event: &'static str },
}
