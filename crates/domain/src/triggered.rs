//! Triggered event — an action definition fired when a bus notification
//! matches its filter.

use serde::{Deserialize, Serialize};

use crate::error::{SundialError, ValidationError};
use crate::filter::Filter;
use crate::path::EventPath;

/// An event definition that fires on matching notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredEvent {
    pub path: EventPath,
    pub filter: Filter,
    /// At most one work item for this event executes at a time; extra
    /// items queue behind the in-flight one instead of being dropped.
    pub serialized: bool,
    /// Whether firings of this event should be logged.
    pub loggable: bool,
    pub paused: bool,
    /// Global change serial stamped at the last mutation.
    pub version: u64,
}

impl TriggeredEvent {
    /// Create a builder for constructing a [`TriggeredEvent`].
    #[must_use]
    pub fn builder() -> TriggeredEventBuilder {
        TriggeredEventBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SundialError::Validation`] when the filter is
    /// structurally invalid.
    pub fn validate(&self) -> Result<(), SundialError> {
        self.filter.validate()?;
        Ok(())
    }
}

/// Step-by-step builder for [`TriggeredEvent`].
#[derive(Debug, Default)]
pub struct TriggeredEventBuilder {
    path: Option<EventPath>,
    filter: Option<Filter>,
    serialized: Option<bool>,
    loggable: Option<bool>,
    paused: Option<bool>,
}

impl TriggeredEventBuilder {
    #[must_use]
    pub fn path(mut self, path: EventPath) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn serialized(mut self, serialized: bool) -> Self {
        self.serialized = Some(serialized);
        self
    }

    #[must_use]
    pub fn loggable(mut self, loggable: bool) -> Self {
        self.loggable = Some(loggable);
        self
    }

    #[must_use]
    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = Some(paused);
        self
    }

    /// Consume the builder, validate, and return a [`TriggeredEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`SundialError::Validation`] if required fields are missing
    /// or the filter is invalid.
    pub fn build(self) -> Result<TriggeredEvent, SundialError> {
        let path = self.path.ok_or(ValidationError::InvalidPath)?;
        let Some(filter) = self.filter else {
            return Err(ValidationError::MissingFilter.into());
        };
        let event = TriggeredEvent {
            path,
            filter,
            serialized: self.serialized.unwrap_or(false),
            loggable: self.loggable.unwrap_or(true),
            paused: self.paused.unwrap_or(false),
            version: 0,
        };
        event.validate()?;
        Ok(event)
    }
}
