//! Geographic coordinate module
//!
//! Provides the validated [`GeoCoordinate`] value type together with the
//! spherical helpers shared by the compass and the map projector: initial
//! great-circle bearing, haversine distance and angle normalization.

mod types;

pub use types::{CoordError, GeoCoordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean Earth radius used for great-circle distance, in meters.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Normalizes an angle in degrees into [0, 360).
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Shortest angular distance between two headings, in [0, 180].
///
/// Accounts for the 0/360 wraparound, so 359° and 1° are 2° apart.
#[inline]
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Initial (forward) great-circle bearing from `from` to `to`.
///
/// Returns degrees in [0, 360) where 0 = North, 90 = East. When both points
/// coincide the bearing is defined as 0°.
pub fn initial_bearing(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    if from.latitude() == to.latitude() && from.longitude() == to.longitude() {
        return 0.0;
    }

    let phi1 = from.latitude().to_radians();
    let phi2 = to.latitude().to_radians();
    let delta_lambda = (to.longitude() - from.longitude()).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Great-circle distance between two points (haversine), in meters.
pub fn haversine_distance(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    let phi1 = from.latitude().to_radians();
    let phi2 = to.latitude().to_radians();
    let delta_phi = phi2 - phi1;
    let delta_lambda = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    MEAN_EARTH_RADIUS_M * c
}
