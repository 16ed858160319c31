//! Core coordinate types and validation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors raised when a coordinate falls outside its valid range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside [-90, 90] or not a number.
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not a number.
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    /// Negative or non-finite altitude.
    #[error("Invalid altitude: {0} (must be zero or positive)")]
    InvalidAltitude(f64),
}

/// A geographic position on the WGS84 ellipsoid.
///
/// Values are validated on construction, so every `GeoCoordinate` in the
/// system is known to be in range. The type is immutable and `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: f64,
}

impl TryFrom<RawCoordinate> for GeoCoordinate {
    type Error = CoordError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        GeoCoordinate::new(raw.latitude, raw.longitude, raw.altitude)
    }
}

impl GeoCoordinate {
    /// Create a validated coordinate.
    ///
    /// # Arguments
    ///
    /// * `latitude` - Degrees, -90 to 90
    /// * `longitude` - Degrees, -180 to 180
    /// * `altitude` - Meters above the ellipsoid, zero or positive
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        if !(altitude >= 0.0 && altitude.is_finite()) {
            return Err(CoordError::InvalidAltitude(altitude));
        }

        Ok(Self {
            latitude,
            longitude,
            altitude,
        })
    }

    /// Create a validated coordinate at sea level.
    pub fn from_lat_lon(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        Self::new(latitude, longitude, 0.0)
    }

    /// Sea-level coordinate from compile-time constants already known to be
    /// in range. Not validated.
    pub(crate) const fn from_known_lat_lon(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
        }
    }

    /// Latitude in degrees.
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Altitude in meters.
    #[inline]
    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// Initial great-circle bearing from this point to `other`, in [0, 360).
    pub fn bearing_to(&self, other: &GeoCoordinate) -> f64 {
        super::initial_bearing(self, other)
    }

    /// Great-circle distance from this point to `other`, in meters.
    pub fn distance_to(&self, other: &GeoCoordinate) -> f64 {
        super::haversine_distance(self, other)
    }
}

impl std::fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)?;
        if self.altitude > 0.0 {
            write!(f, ",{}", self.altitude)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinate() {
        let coord = GeoCoordinate::new(-23.605689, -46.664609, 760.0).unwrap();
        assert_eq!(coord.latitude(), -23.605689);
        assert_eq!(coord.longitude(), -46.664609);
        assert_eq!(coord.altitude(), 760.0);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(GeoCoordinate::new(90.0, 180.0, 0.0).is_ok());
        assert!(GeoCoordinate::new(-90.0, -180.0, 0.0).is_ok());
    }

    #[test]
    fn test_invalid_latitude() {
        let err = GeoCoordinate::new(90.5, 0.0, 0.0).unwrap_err();
        assert_eq!(err, CoordError::InvalidLatitude(90.5));
    }

    #[test]
    fn test_invalid_longitude() {
        let err = GeoCoordinate::new(0.0, -180.01, 0.0).unwrap_err();
        assert!(matches!(err, CoordError::InvalidLongitude(_)));
    }

    #[test]
    fn test_negative_altitude_rejected() {
        let err = GeoCoordinate::new(0.0, 0.0, -1.0).unwrap_err();
        assert!(matches!(err, CoordError::InvalidAltitude(_)));
    }

    #[test]
    fn test_nan_rejected() {
        assert!(GeoCoordinate::new(f64::NAN, 0.0, 0.0).is_err());
        assert!(GeoCoordinate::new(0.0, f64::NAN, 0.0).is_err());
        assert!(GeoCoordinate::new(0.0, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        let coord = GeoCoordinate::from_lat_lon(-33.439, -70.645).unwrap();
        assert_eq!(coord.to_string(), "-33.439000,-70.645000");

        let coord = GeoCoordinate::new(1.0, 2.0, 30.0).unwrap();
        assert_eq!(coord.to_string(), "1.000000,2.000000,30");
    }

    #[test]
    fn test_serde_validates() {
        let ok: GeoCoordinate =
            serde_json::from_str(r#"{"latitude": 10.0, "longitude": 20.0}"#).unwrap();
        assert_eq!(ok.altitude(), 0.0);

        let bad = serde_json::from_str::<GeoCoordinate>(r#"{"latitude": 100.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }
}
