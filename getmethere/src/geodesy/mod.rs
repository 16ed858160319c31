//! Geodetic coordinate transforms.
//!
//! Converts geographic coordinates to Earth-Centered Earth-Fixed (ECEF)
//! vectors on the WGS84 ellipsoid, and ECEF differences to the local
//! East-North-Up (ENU) tangent plane of an observer.
//!
//! # Example
//!
//! ```
//! use getmethere::geo::GeoCoordinate;
//! use getmethere::geodesy::{to_ecef, to_enu};
//!
//! let me = GeoCoordinate::from_lat_lon(0.0, 0.0).unwrap();
//! let poi = GeoCoordinate::from_lat_lon(0.0, 0.01).unwrap();
//!
//! let enu = to_enu(&me, &to_ecef(&me), &to_ecef(&poi));
//! assert!(enu.east > 1000.0);
//! ```

pub mod ar;

use glam::{DVec3, DVec4};
use serde::Serialize;

use crate::geo::GeoCoordinate;

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;

/// Square of the WGS84 first eccentricity.
pub const WGS84_E2: f64 = 0.006_694_379_990_14;

/// WGS84 semi-minor (polar) radius in meters.
pub const WGS84_B: f64 = 6_356_752.314_245;

/// A position in the Earth-Centered Earth-Fixed frame, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EcefVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EcefVector {
    /// Euclidean distance from the Earth's center.
    pub fn norm(&self) -> f64 {
        self.as_dvec3().length()
    }

    fn as_dvec3(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

/// A direction in the observer's East-North-Up frame, in meters.
///
/// Carries a homogeneous `w = 1` so it can be multiplied directly by a 4×4
/// camera projection/rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnuVector {
    pub east: f64,
    pub north: f64,
    pub up: f64,
    pub w: f64,
}

impl EnuVector {
    /// Homogeneous 4-vector `(east, north, up, w)`.
    pub fn to_homogeneous(&self) -> DVec4 {
        DVec4::new(self.east, self.north, self.up, self.w)
    }

    /// Horizontal distance in the tangent plane.
    pub fn horizontal_distance(&self) -> f64 {
        self.east.hypot(self.north)
    }
}

/// Converts a geographic coordinate to ECEF on the WGS84 ellipsoid.
///
/// Inputs are validated `GeoCoordinate`s, so the only failure mode is the
/// NaN propagation a caller could provoke by bypassing validation.
#[inline]
pub fn to_ecef(coord: &GeoCoordinate) -> EcefVector {
    let lat = coord.latitude().to_radians();
    let lon = coord.longitude().to_radians();
    let alt = coord.altitude();

    let (slat, clat) = lat.sin_cos();
    let (slon, clon) = lon.sin_cos();

    // Prime vertical radius of curvature
    let n = WGS84_A / (1.0 - WGS84_E2 * slat * slat).sqrt();

    EcefVector {
        x: (n + alt) * clat * clon,
        y: (n + alt) * clat * slon,
        z: (n * (1.0 - WGS84_E2) + alt) * slat,
    }
}

/// Rotates the ECEF difference `target - observer` into the observer's ENU frame.
///
/// # Arguments
///
/// * `observer` - Geographic position of the observer (defines the tangent plane)
/// * `observer_ecef` - The observer's position in ECEF
/// * `target_ecef` - The target's position in ECEF
pub fn to_enu(
    observer: &GeoCoordinate,
    observer_ecef: &EcefVector,
    target_ecef: &EcefVector,
) -> EnuVector {
    let lat = observer.latitude().to_radians();
    let lon = observer.longitude().to_radians();

    let (slat, clat) = lat.sin_cos();
    let (slon, clon) = lon.sin_cos();

    let d = target_ecef.as_dvec3() - observer_ecef.as_dvec3();

    EnuVector {
        east: -slon * d.x + clon * d.y,
        north: -slat * clon * d.x - slat * slon * d.y + clat * d.z,
        up: clat * clon * d.x + clat * slon * d.y + slat * d.z,
        w: 1.0,
    }
}

/// Convenience wrapper computing the ENU vector from `observer` to `target`.
pub fn enu_between(observer: &GeoCoordinate, target: &GeoCoordinate) -> EnuVector {
    to_enu(observer, &to_ecef(observer), &to_ecef(target))
}
