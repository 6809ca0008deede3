//! Schedule kinds and next-fire-time computation.

use std::fmt;

use chrono::{Datelike, Duration, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ValidationError};
use crate::location::GeoLocation;
use crate::solar::{SolarDay, solar_day};
use crate::time::Timestamp;

/// Day-of-week bit mask (bit 0 = Monday … bit 6 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayMask(u8);

impl DayMask {
    /// Mask with every day enabled.
    #[must_use]
    pub fn all() -> Self {
        Self(0b0111_1111)
    }

    /// Mask with no day enabled (invalid for a schedule; useful as a
    /// starting point for [`with`](Self::with)).
    #[must_use]
    pub fn none() -> Self {
        Self(0)
    }

    /// Return a copy with `day` enabled.
    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | 1 << day.num_days_from_monday())
    }

    /// Whether `day` is enabled.
    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Whether no day is enabled.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 & 0b0111_1111 == 0
    }
}

impl Default for DayMask {
    fn default() -> Self {
        Self::all()
    }
}

/// When a scheduled event fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Every `period_secs` seconds, measured from the previous firing
    /// window. No drift correction.
    Periodic { period_secs: u64 },
    /// At `hour:minute` UTC on every day enabled in `days`.
    TimeOfDay { hour: u8, minute: u8, days: DayMask },
    /// At sunrise plus a signed offset in minutes.
    Sunrise { offset_min: i32 },
    /// At sunset plus a signed offset in minutes.
    Sunset { offset_min: i32 },
    /// Exactly once, at a fixed absolute instant. The owning event is
    /// removed from the registry after firing.
    OneShot { at: Timestamp },
}

/// Search horizon for the next solar occurrence. Past this, the
/// configured coordinates simply never produce the event.
const SOLAR_HORIZON_DAYS: i64 = 366;

impl Schedule {
    /// Check schedule invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a zero period, an empty day mask,
    /// or an out-of-range time of day.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Periodic { period_secs } => {
                if *period_secs == 0 {
                    return Err(ValidationError::ZeroPeriod);
                }
            }
            Self::TimeOfDay { hour, minute, days } => {
                if *hour > 23 || *minute > 59 {
                    return Err(ValidationError::TimeOutOfRange {
                        hour: *hour,
                        minute: *minute,
                    });
                }
                if days.is_empty() {
                    return Err(ValidationError::EmptyDayMask);
                }
            }
            Self::Sunrise { .. } | Self::Sunset { .. } | Self::OneShot { .. } => {}
        }
        Ok(())
    }

    /// Whether this schedule depends on the configured location.
    #[must_use]
    pub fn is_solar(&self) -> bool {
        matches!(self, Self::Sunrise { .. } | Self::Sunset { .. })
    }

    /// Whether this schedule fires exactly once.
    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        matches!(self, Self::OneShot { .. })
    }

    /// Compute the next absolute fire time strictly relative to `now`.
    ///
    /// For periodic schedules the caller passes the firing window's
    /// timestamp as `now`, so the next fire is `T + P` regardless of how
    /// long the recompute itself was delayed.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NoEnabledDay`] when a time-of-day schedule
    /// matches no enabled day within a week, and
    /// [`ScheduleError::NoSolarEvent`] when the coordinates never produce
    /// the solar event within [`SOLAR_HORIZON_DAYS`].
    pub fn next_fire(
        &self,
        now: Timestamp,
        location: GeoLocation,
    ) -> Result<Timestamp, ScheduleError> {
        match self {
            Self::Periodic { period_secs } => {
                Ok(now + Duration::seconds(i64::try_from(*period_secs).unwrap_or(i64::MAX)))
            }
            Self::TimeOfDay { hour, minute, days } => {
                for offset in 0..=7 {
                    let date = now.date_naive() + Duration::days(offset);
                    if !days.contains(date.weekday()) {
                        continue;
                    }
                    let Some(naive) = date.and_hms_opt(u32::from(*hour), u32::from(*minute), 0)
                    else {
                        continue;
                    };
                    let candidate = Utc.from_utc_datetime(&naive);
                    if candidate > now {
                        return Ok(candidate);
                    }
                }
                Err(ScheduleError::NoEnabledDay)
            }
            Self::Sunrise { offset_min } => next_solar(now, location, SolarPick::Rise, *offset_min),
            Self::Sunset { offset_min } => next_solar(now, location, SolarPick::Set, *offset_min),
            Self::OneShot { at } => Ok(*at),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic { period_secs } => write!(f, "periodic({period_secs}s)"),
            Self::TimeOfDay { hour, minute, .. } => write!(f, "time_of_day({hour:02}:{minute:02})"),
            Self::Sunrise { offset_min } => write!(f, "sunrise({offset_min:+}m)"),
            Self::Sunset { offset_min } => write!(f, "sunset({offset_min:+}m)"),
            Self::OneShot { at } => write!(f, "one_shot({at})"),
        }
    }
}

enum SolarPick {
    Rise,
    Set,
}

fn next_solar(
    now: Timestamp,
    location: GeoLocation,
    pick: SolarPick,
    offset_min: i32,
) -> Result<Timestamp, ScheduleError> {
    for day in 0..SOLAR_HORIZON_DAYS {
        let date = now.date_naive() + Duration::days(day);
        let SolarDay::Normal { sunrise, sunset } = solar_day(date, location) else {
            continue;
        };
        let base = match pick {
            SolarPick::Rise => sunrise,
            SolarPick::Set => sunset,
        };
        let candidate = base + Duration::minutes(i64::from(offset_min));
        if candidate > now {
            return Ok(candidate);
        }
    }
    Err(ScheduleError::NoSolarEvent {
        event: match pick {
            SolarPick::Rise => "sunrise",
            SolarPick::Set => "sunset",
        },
    })
}
