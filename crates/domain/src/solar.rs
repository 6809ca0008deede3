//! Sunrise/sunset computation from latitude, longitude, and date.
//!
//! Implements the NOAA solar-position approximation (fractional year,
//! equation of time, solar declination, hour angle at a 90.833° zenith).
//! Accuracy is within a couple of minutes at temperate latitudes, which is
//! plenty for firing porch lights.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::location::GeoLocation;
use crate::time::Timestamp;

/// Solar events for one calendar date at one location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolarDay {
    /// The sun rises and sets on this date.
    Normal {
        sunrise: Timestamp,
        sunset: Timestamp,
    },
    /// Polar day: the sun never sets.
    AlwaysUp,
    /// Polar night: the sun never rises.
    AlwaysDown,
}

/// Zenith angle for official sunrise/sunset (solar disc + refraction).
const ZENITH_DEG: f64 = 90.833;

/// Compute sunrise and sunset (UTC) for `date` at `location`.
#[must_use]
pub fn solar_day(date: NaiveDate, location: GeoLocation) -> SolarDay {
    let lat = location.latitude.to_radians();

    // Fractional year at solar noon, in radians.
    let day_of_year = f64::from(date.ordinal()) - 1.0;
    let gamma = 2.0 * std::f64::consts::PI / 365.0 * day_of_year;

    // Equation of time (minutes) and solar declination (radians).
    let eqtime = 229.18
        * (0.000_075 + 0.001_868 * gamma.cos()
            - 0.032_077 * gamma.sin()
            - 0.014_615 * (2.0 * gamma).cos()
            - 0.040_849 * (2.0 * gamma).sin());
    let decl = 0.006_918 - 0.399_912 * gamma.cos() + 0.070_257 * gamma.sin()
        - 0.006_758 * (2.0 * gamma).cos()
        + 0.000_907 * (2.0 * gamma).sin()
        - 0.002_697 * (3.0 * gamma).cos()
        + 0.001_48 * (3.0 * gamma).sin();

    let cos_hour_angle =
        ZENITH_DEG.to_radians().cos() / (lat.cos() * decl.cos()) - lat.tan() * decl.tan();
    if cos_hour_angle > 1.0 {
        return SolarDay::AlwaysDown;
    }
    if cos_hour_angle < -1.0 {
        return SolarDay::AlwaysUp;
    }
    let hour_angle_deg = cos_hour_angle.acos().to_degrees();

    // Minutes after UTC midnight. May fall outside 0..1440 at extreme
    // longitudes; chrono Duration arithmetic normalizes that.
    let sunrise_min = 720.0 - 4.0 * (location.longitude + hour_angle_deg) - eqtime;
    let sunset_min = 720.0 - 4.0 * (location.longitude - hour_angle_deg) - eqtime;

    let midnight = Utc
        .from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
    SolarDay::Normal {
        sunrise: midnight + Duration::seconds((sunrise_min * 60.0) as i64),
        sunset: midnight + Duration::seconds((sunset_min * 60.0) as i64),
    }
}

/// Whether `now` falls between that day's sunset and the next sunrise.
///
/// Uses the same solar math as scheduled events, with no offset. During
/// polar day this is always `false`, during polar night always `true`.
#[must_use]
pub fn is_night(now: Timestamp, location: GeoLocation) -> bool {
    match solar_day(now.date_naive(), location) {
        SolarDay::Normal { sunrise, sunset } => now < sunrise || now >= sunset,
        SolarDay::AlwaysUp => false,
        SolarDay::AlwaysDown => true,
    }
}
