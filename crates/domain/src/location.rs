//! Geographic location used for solar calculations.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Latitude/longitude pair in decimal degrees (east and north positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// Create a validated location.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CoordinatesOutOfRange`] when latitude is
    /// outside ±90° or longitude outside ±180°.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::CoordinatesOutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl Default for GeoLocation {
    /// Null island. A controller that never calls `set_location` still
    /// gets deterministic solar times.
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_valid_coordinates() {
        let loc = GeoLocation::new(59.91, 10.75).unwrap();
        assert!((loc.latitude - 59.91).abs() < f64::EPSILON);
    }

    #[test]
    fn should_reject_latitude_beyond_poles() {
        assert!(GeoLocation::new(90.5, 0.0).is_err());
        assert!(GeoLocation::new(-91.0, 0.0).is_err());
    }

    #[test]
    fn should_reject_longitude_beyond_antimeridian() {
        assert!(GeoLocation::new(0.0, 180.5).is_err());
        assert!(GeoLocation::new(0.0, -200.0).is_err());
    }
}
