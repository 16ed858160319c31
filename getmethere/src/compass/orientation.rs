//! Device orientation from raw sensor vectors.
//!
//! Two sources are supported:
//!
//! - **Gravity (or accelerometer) + magnetometer**: the classic tilt-compensated
//!   compass. The magnetic vector crossed with gravity gives East, gravity
//!   crossed with East gives North, and gravity itself is Up.
//! - **Rotation vector**: a unit quaternion from the platform's fused
//!   orientation sensor, expanded into a homogeneous 4×4 rotation for the AR
//!   overlay.
//!
//! Both produce device-to-world matrices: rows are the world axes (East,
//! North, Up) expressed in device coordinates.

use glam::{DMat3, DMat4, DVec3};

use crate::geo::normalize_degrees;

/// Standard gravity in m/s².
const STANDARD_GRAVITY: f64 = 9.81;

/// Below this squared magnitude the device is considered in free fall.
const FREE_FALL_GRAVITY_SQUARED: f64 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;

/// Minimum |E| where E = magnetic × gravity.
///
/// Smaller values mean the field is nearly parallel to gravity (close to the
/// magnetic pole) or the readings are degenerate.
const MIN_EAST_NORM: f64 = 0.1;

/// Orientation computed from a gravity/magnetic pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Rotation matrix, rows East, North, Up.
    pub rotation: DMat3,
    /// Magnetic azimuth in [0, 360), before declination correction.
    pub azimuth_deg: f64,
    /// Pitch in degrees (rotation about the device X axis).
    pub pitch_deg: f64,
    /// Roll in degrees (rotation about the device Y axis).
    pub roll_deg: f64,
}

impl Orientation {
    /// Derive the orientation from gravity and magnetic field samples.
    ///
    /// Returns `None` when the device is in free fall or the two vectors are
    /// (nearly) parallel, in which case no heading can be defined.
    pub fn from_gravity_and_magnetic(gravity: DVec3, magnetic: DVec3) -> Option<Self> {
        let rotation = rotation_matrix(gravity, magnetic)?;

        let east = rotation.row(0);
        let north = rotation.row(1);
        let up = rotation.row(2);

        let azimuth = east.y.atan2(north.y);
        let pitch = (-up.y).clamp(-1.0, 1.0).asin();
        let roll = (-up.x).atan2(up.z);

        Some(Self {
            rotation,
            azimuth_deg: normalize_degrees(azimuth.to_degrees()),
            pitch_deg: pitch.to_degrees(),
            roll_deg: roll.to_degrees(),
        })
    }
}

/// Tilt-compensated rotation matrix from gravity and geomagnetic vectors.
///
/// Both vectors are in device coordinates. The result has the unit East,
/// North and Up vectors as rows.
pub fn rotation_matrix(gravity: DVec3, magnetic: DVec3) -> Option<DMat3> {
    if !gravity.is_finite() || !magnetic.is_finite() {
        return None;
    }
    if gravity.length_squared() < FREE_FALL_GRAVITY_SQUARED {
        return None;
    }

    let east = magnetic.cross(gravity);
    let east_norm = east.length();
    if east_norm < MIN_EAST_NORM {
        return None;
    }

    let east = east / east_norm;
    let up = gravity.normalize();
    let north = up.cross(east);

    Some(DMat3::from_cols(east, north, up).transpose())
}

/// Homogeneous 4×4 device-to-world rotation from a rotation-vector sample.
///
/// `values` holds the quaternion's vector part `(x, y, z)` and optionally its
/// scalar part; when the scalar is missing it is reconstructed assuming a
/// unit quaternion. Fewer than three values yields `None`.
pub fn rotation_from_vector(values: &[f64]) -> Option<DMat4> {
    if values.len() < 3 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let (q1, q2, q3) = (values[0], values[1], values[2]);
    let q0 = match values.get(3) {
        Some(&w) => w,
        None => (1.0 - q1 * q1 - q2 * q2 - q3 * q3).max(0.0).sqrt(),
    };

    let sq_q1 = 2.0 * q1 * q1;
    let sq_q2 = 2.0 * q2 * q2;
    let sq_q3 = 2.0 * q3 * q3;
    let q1_q2 = 2.0 * q1 * q2;
    let q3_q0 = 2.0 * q3 * q0;
    let q1_q3 = 2.0 * q1 * q3;
    let q2_q0 = 2.0 * q2 * q0;
    let q2_q3 = 2.0 * q2 * q3;
    let q1_q0 = 2.0 * q1 * q0;

    // Row-major layout, transposed into glam's column-major storage below
    let rows = [
        1.0 - sq_q2 - sq_q3,
        q1_q2 - q3_q0,
        q1_q3 + q2_q0,
        0.0,
        q1_q2 + q3_q0,
        1.0 - sq_q1 - sq_q3,
        q2_q3 - q1_q0,
        0.0,
        q1_q3 - q2_q0,
        q2_q3 + q1_q0,
        1.0 - sq_q1 - sq_q2,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
    ];

    Some(DMat4::from_cols_array(&rows).transpose())
}
