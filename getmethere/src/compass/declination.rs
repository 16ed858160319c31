//! Magnetic declination models.
//!
//! The magnetometer points at magnetic north; bearings to targets are
//! computed against true north. A [`DeclinationModel`] supplies the angle
//! between the two at a location, added to the magnetic azimuth.

use chrono::{DateTime, Utc};

use crate::geo::{initial_bearing, GeoCoordinate};

/// Latitude of the geomagnetic north pole used by [`DipoleDeclination`].
pub const GEOMAGNETIC_POLE_LAT: f64 = 80.8;

/// Longitude of the geomagnetic north pole used by [`DipoleDeclination`].
pub const GEOMAGNETIC_POLE_LON: f64 = -72.8;

const GEOMAGNETIC_POLE: GeoCoordinate =
    GeoCoordinate::from_known_lat_lon(GEOMAGNETIC_POLE_LAT, GEOMAGNETIC_POLE_LON);

/// Source of magnetic declination.
///
/// Returns degrees, positive when magnetic north lies east of true north.
pub trait DeclinationModel: Send + Sync {
    fn declination_deg(&self, at: &GeoCoordinate, when: DateTime<Utc>) -> f64;
}

/// Treats magnetic north as true north.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroDeclination;

impl DeclinationModel for ZeroDeclination {
    fn declination_deg(&self, _at: &GeoCoordinate, _when: DateTime<Utc>) -> f64 {
        0.0
    }
}

/// Centered-dipole approximation of the geomagnetic field.
///
/// Magnetic north is taken as the direction of the geomagnetic pole, so the
/// declination is the initial great-circle bearing towards it, wrapped into
/// (-180, 180]. The model ignores secular variation; `when` is unused.
#[derive(Debug, Clone, Copy)]
pub struct DipoleDeclination {
    pole: GeoCoordinate,
}

impl DipoleDeclination {
    /// Dipole model with a custom pole position.
    pub fn with_pole(pole: GeoCoordinate) -> Self {
        Self { pole }
    }

    /// Position of the geomagnetic pole.
    pub fn pole(&self) -> &GeoCoordinate {
        &self.pole
    }
}

impl Default for DipoleDeclination {
    fn default() -> Self {
        Self {
            pole: GEOMAGNETIC_POLE,
        }
    }
}

impl DeclinationModel for DipoleDeclination {
    fn declination_deg(&self, at: &GeoCoordinate, _when: DateTime<Utc>) -> f64 {
        let bearing = initial_bearing(at, &self.pole);
        if bearing > 180.0 {
            bearing - 360.0
        } else {
            bearing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> GeoCoordinate {
        GeoCoordinate::from_lat_lon(lat, lon).unwrap()
    }

    #[test]
    fn test_default_pole_is_valid() {
        let pole = *DipoleDeclination::default().pole();
        assert_eq!(
            GeoCoordinate::from_lat_lon(GEOMAGNETIC_POLE_LAT, GEOMAGNETIC_POLE_LON),
            Ok(pole)
        );
    }

    #[test]
    fn test_zero_declination() {
        assert_eq!(
            ZeroDeclination.declination_deg(&coord(51.5, -0.1), Utc::now()),
            0.0
        );
    }

    #[test]
    fn test_dipole_on_pole_meridian_is_zero() {
        let model = DipoleDeclination::default();
        let d = model.declination_deg(&coord(10.0, GEOMAGNETIC_POLE_LON), Utc::now());
        assert!(d.abs() < 1e-9, "got {}", d);
    }

    #[test]
    fn test_dipole_sign_follows_pole_side() {
        let model = DipoleDeclination::default();
        // East of the pole meridian the pole lies to the north-west
        let east = model.declination_deg(&coord(40.0, 0.0), Utc::now());
        assert!(east < 0.0, "got {}", east);
        // West of it, to the north-east
        let west = model.declination_deg(&coord(40.0, -120.0), Utc::now());
        assert!(west > 0.0, "got {}", west);
    }

    #[test]
    fn test_dipole_range() {
        let model = DipoleDeclination::default();
        for lat in [-80.0, -30.0, 0.0, 30.0, 70.0] {
            for lon in [-179.0, -90.0, 0.0, 90.0, 179.0] {
                let d = model.declination_deg(&coord(lat, lon), Utc::now());
                assert!(d > -180.0 && d <= 180.0);
            }
        }
    }

    #[test]
    fn test_custom_pole() {
        let model = DipoleDeclination::with_pole(coord(90.0, 0.0));
        let d = model.declination_deg(&coord(45.0, 45.0), Utc::now());
        assert!(d.abs() < 1e-9);
        assert_eq!(model.pole().latitude(), 90.0);
    }
}
