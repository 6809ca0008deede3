//! Scheduled event — an action definition fired at computed absolute times.

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, SundialError, ValidationError};
use crate::location::GeoLocation;
use crate::path::EventPath;
use crate::schedule::Schedule;
use crate::time::Timestamp;

/// An event definition that fires at computed absolute times.
///
/// `next_fire` is derived state: it is recomputed whenever the schedule,
/// the location, or a firing changes it, and must always be consistent
/// with the schedule kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub path: EventPath,
    pub schedule: Schedule,
    pub next_fire: Timestamp,
    pub paused: bool,
    /// Global change serial stamped at the last mutation.
    pub version: u64,
}

impl ScheduledEvent {
    /// Create a builder for constructing a [`ScheduledEvent`].
    #[must_use]
    pub fn builder() -> ScheduledEventBuilder {
        ScheduledEventBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SundialError::Validation`] when the schedule parameters
    /// are malformed.
    pub fn validate(&self) -> Result<(), SundialError> {
        self.schedule.validate()?;
        Ok(())
    }

    /// Recompute `next_fire` relative to `now` at the given location.
    ///
    /// # Errors
    ///
    /// Propagates [`ScheduleError`] from the schedule computation.
    pub fn recompute(
        &mut self,
        now: Timestamp,
        location: GeoLocation,
    ) -> Result<(), ScheduleError> {
        self.next_fire = self.schedule.next_fire(now, location)?;
        Ok(())
    }
}

/// Step-by-step builder for [`ScheduledEvent`].
#[derive(Debug, Default)]
pub struct ScheduledEventBuilder {
    path: Option<EventPath>,
    schedule: Option<Schedule>,
    paused: Option<bool>,
    next_fire: Option<Timestamp>,
}

impl ScheduledEventBuilder {
    #[must_use]
    pub fn path(mut self, path: EventPath) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    #[must_use]
    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = Some(paused);
        self
    }

    #[must_use]
    pub fn next_fire(mut self, next_fire: Timestamp) -> Self {
        self.next_fire = Some(next_fire);
        self
    }

    /// Consume the builder, validate, and return a [`ScheduledEvent`].
    ///
    /// When `next_fire` was not set explicitly it defaults to now; the
    /// registry recomputes it on insert anyway.
    ///
    /// # Errors
    ///
    /// Returns [`SundialError::Validation`] if required fields are missing
    /// or the schedule is malformed.
    pub fn build(self) -> Result<ScheduledEvent, SundialError> {
        let path = self.path.ok_or(ValidationError::InvalidPath)?;
        let Some(schedule) = self.schedule else {
            return Err(ValidationError::MissingSchedule.into());
        };
        let event = ScheduledEvent {
            path,
            schedule,
            next_fire: self.next_fire.unwrap_or_else(crate::time::now),
            paused: self.paused.unwrap_or(false),
            version: 0,
        };
        event.validate()?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn path(raw: &str) -> EventPath {
        EventPath::parse(raw).unwrap()
    }

    #[test]
    fn should_build_valid_scheduled_event() {
        let event = ScheduledEvent::builder()
            .path(path("/heating/morning"))
            .schedule(Schedule::Periodic { period_secs: 60 })
            .build()
            .unwrap();
        assert_eq!(event.path.as_str(), "/heating/morning");
        assert!(!event.paused);
        assert_eq!(event.version, 0);
    }

    #[test]
    fn should_reject_missing_path() {
        let result = ScheduledEvent::builder()
            .schedule(Schedule::Periodic { period_secs: 60 })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_invalid_schedule() {
        let result = ScheduledEvent::builder()
            .path(path("/x/y"))
            .schedule(Schedule::Periodic { period_secs: 0 })
            .build();
        assert!(matches!(
            result,
            Err(SundialError::Validation(ValidationError::ZeroPeriod))
        ));
    }

    #[test]
    fn should_recompute_next_fire_from_given_instant() {
        let mut event = ScheduledEvent::builder()
            .path(path("/x/y"))
            .schedule(Schedule::Periodic { period_secs: 300 })
            .build()
            .unwrap();
        let fired_at = Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap();
        event.recompute(fired_at, GeoLocation::default()).unwrap();
        assert_eq!(event.next_fire, fired_at + Duration::seconds(300));
    }

    #[test]
    fn should_surface_schedule_error_from_recompute() {
        let mut event = ScheduledEvent {
            path: path("/x/y"),
            schedule: Schedule::TimeOfDay {
                hour: 8,
                minute: 0,
                days: crate::schedule::DayMask::none(),
            },
            next_fire: crate::time::now(),
            paused: false,
            version: 0,
        };
        let result = event.recompute(crate::time::now(), GeoLocation::default());
        assert_eq!(result, Err(ScheduleError::NoEnabledDay));
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let event = ScheduledEvent::builder()
            .path(path("/lighting/dusk"))
            .schedule(Schedule::Sunset { offset_min: -15 })
            .build()
            .unwrap();
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ScheduledEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.path, event.path);
        assert_eq!(parsed.schedule, event.schedule);
    }
}
