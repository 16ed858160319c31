//! Augmented-reality placement of a target on the camera image.
//!
//! The device rotation matrix (from the rotation-vector sensor) maps device
//! coordinates to the world ENU frame. Its transpose takes the ENU direction
//! to the target into device/camera coordinates, where a perspective frustum
//! turns it into clip space.
//!
//! ```text
//! clip = frustum(aspect) × rotationᵀ × enu(observer → target)
//! ```
//!
//! A positive clip `w` means the target lies in front of the camera (the
//! camera looks down its -Z axis). What the overlay does when the target is
//! behind, e.g. asking the user to tilt the device, is left to the caller.

use glam::{DMat4, DVec2, DVec4};
use serde::Serialize;

use super::enu_between;
use crate::geo::GeoCoordinate;

/// Near clipping plane of the camera frustum.
pub const NEAR_PLANE: f64 = 0.5;

/// Far clipping plane of the camera frustum.
pub const FAR_PLANE: f64 = 2000.0;

/// Where a target lands relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArPlacement {
    /// Homogeneous clip-space vector `(x, y, z, w)`.
    #[serde(skip)]
    pub clip: DVec4,
    /// Whether the target is in front of the camera.
    pub in_front: bool,
    /// Normalized screen position, `(0,0)` top-left and `(1,1)` bottom-right.
    ///
    /// Only meaningful when `in_front` is true; may fall outside [0,1] when
    /// the target is off-screen.
    pub screen: Option<(f64, f64)>,
}

/// Projects geographic targets through a camera frustum.
#[derive(Debug, Clone, Copy)]
pub struct ArProjector {
    projection: DMat4,
}

impl ArProjector {
    /// Create a projector for a viewport with the given width/height ratio.
    pub fn new(aspect_ratio: f64) -> Self {
        Self {
            projection: frustum(-aspect_ratio, aspect_ratio, -1.0, 1.0, NEAR_PLANE, FAR_PLANE),
        }
    }

    /// Create a projector for a viewport in pixels.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f64 / height as f64
        };
        Self::new(aspect)
    }

    /// The perspective matrix used by this projector.
    pub fn projection(&self) -> &DMat4 {
        &self.projection
    }

    /// Place `target` as seen from `observer` by a device with `rotation`.
    ///
    /// `rotation` is the device-to-world matrix produced by
    /// [`crate::compass::rotation_from_vector`].
    pub fn project(
        &self,
        rotation: &DMat4,
        observer: &GeoCoordinate,
        target: &GeoCoordinate,
    ) -> ArPlacement {
        let enu = enu_between(observer, target).to_homogeneous();
        self.project_enu(rotation, enu)
    }

    /// Place an already computed homogeneous ENU vector.
    pub fn project_enu(&self, rotation: &DMat4, enu: DVec4) -> ArPlacement {
        let clip = self.projection * rotation.transpose() * enu;
        let in_front = clip.w > 0.0;

        let screen = in_front.then(|| {
            let ndc = DVec2::new(clip.x / clip.w, clip.y / clip.w);
            (0.5 + 0.5 * ndc.x, 0.5 - 0.5 * ndc.y)
        });

        ArPlacement {
            clip,
            in_front,
            screen,
        }
    }
}

/// OpenGL-style perspective frustum (column-major, right-handed, -Z forward).
fn frustum(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> DMat4 {
    let width = right - left;
    let height = top - bottom;
    let depth = far - near;

    DMat4::from_cols_array(&[
        2.0 * near / width,
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 * near / height,
        0.0,
        0.0,
        (right + left) / width,
        (top + bottom) / height,
        -(far + near) / depth,
        -1.0,
        0.0,
        0.0,
        -2.0 * far * near / depth,
        0.0,
    ])
}
