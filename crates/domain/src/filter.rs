//! Trigger filters — expressions matched against incoming notifications.
//!
//! A filter sees the notification's structured fields, whether it is
//! currently night (solar math, no offset), and the current wall time.
//! Evaluation is fallible: a structurally valid filter can still fail at
//! runtime (e.g. a range test against a non-numeric field), and the
//! listener must treat that as "this filter did not match" for the one
//! notification while other filters keep running.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::payload::EventPayload;
use crate::time::Timestamp;

/// Expression tree evaluated against one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Field present and equal to `value` (JSON equality).
    FieldEquals {
        field: String,
        value: serde_json::Value,
    },
    /// Field present, regardless of value.
    FieldExists { field: String },
    /// Field numeric and within `min..=max`. Fails (does not match) when
    /// the field is missing; errors when it is present but not numeric.
    FieldInRange { field: String, min: f64, max: f64 },
    /// Currently between sunset and the next sunrise.
    IsNight,
    /// Currently between sunrise and sunset.
    IsDay,
    /// Wall time within `after..=before` (`HH:MM`, overnight ranges
    /// such as `22:00`–`06:00` supported).
    TimeRange { after: String, before: String },
    /// Every child matches.
    All { filters: Vec<Filter> },
    /// At least one child matches.
    Any { filters: Vec<Filter> },
    /// Child does not match.
    Not { filter: Box<Filter> },
}

/// Inputs available to one filter evaluation.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub payload: &'a EventPayload,
    pub night: bool,
    pub now: Timestamp,
}

/// Runtime evaluation failure for one filter against one notification.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A range test hit a field that is not a number.
    #[error("field '{field}' is not numeric")]
    NotNumeric { field: String },
}

impl Filter {
    /// Check structural invariants, recursively.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for empty field names, empty
    /// combinators, or malformed time bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::FieldEquals { field, .. }
            | Self::FieldExists { field }
            | Self::FieldInRange { field, .. } => {
                if field.is_empty() {
                    return Err(ValidationError::EmptyFilterField);
                }
            }
            Self::IsNight | Self::IsDay => {}
            Self::TimeRange { after, before } => {
                validate_time_bound(after)?;
                validate_time_bound(before)?;
            }
            Self::All { filters } | Self::Any { filters } => {
                if filters.is_empty() {
                    return Err(ValidationError::EmptyFilterCombinator);
                }
                for filter in filters {
                    filter.validate()?;
                }
            }
            Self::Not { filter } => filter.validate()?,
        }
        Ok(())
    }

    /// Evaluate against one notification.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] when the filter cannot be evaluated against
    /// this payload (e.g. a range test on a non-numeric field).
    pub fn matches(&self, ctx: &FilterContext<'_>) -> Result<bool, FilterError> {
        match self {
            Self::FieldEquals { field, value } => {
                Ok(ctx.payload.get(field).is_some_and(|actual| actual == value))
            }
            Self::FieldExists { field } => Ok(ctx.payload.get(field).is_some()),
            Self::FieldInRange { field, min, max } => match ctx.payload.get(field) {
                None => Ok(false),
                Some(value) => {
                    let number = value.as_f64().ok_or_else(|| FilterError::NotNumeric {
                        field: field.clone(),
                    })?;
                    Ok((*min..=*max).contains(&number))
                }
            },
            Self::IsNight => Ok(ctx.night),
            Self::IsDay => Ok(!ctx.night),
            Self::TimeRange { after, before } => {
                let now = ctx.now.format("%H:%M").to_string();
                if after <= before {
                    // Same-day range: after <= now <= before
                    Ok(now >= *after && now <= *before)
                } else {
                    // Overnight range (e.g. 22:00..06:00): now >= after OR now <= before
                    Ok(now >= *after || now <= *before)
                }
            }
            Self::All { filters } => {
                for filter in filters {
                    if !filter.matches(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any { filters } => {
                for filter in filters {
                    if filter.matches(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { filter } => Ok(!filter.matches(ctx)?),
        }
    }
}

fn validate_time_bound(bound: &str) -> Result<(), ValidationError> {
    chrono::NaiveTime::parse_from_str(bound, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidTimeBound(bound.to_string()))
}
