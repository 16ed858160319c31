//! Map projection module
//!
//! Maps geographic coordinates onto the pixel space of web-map rasters.
//!
//! # Architecture
//!
//! ```text
//! GeoCoordinate ──► MapProjection (Mercator, world pixels at zoom Z)
//!                        │
//!                        ▼
//!               OfflineMapProjector (raster center + scale) ──► raster pixel
//! ```
//!
//! Only the forward direction is supported. Asking a projection for the
//! inverse is a contract violation and yields [`ProjectionError::Unsupported`].

mod mercator;
mod offline;

pub use mercator::{MercatorProjection, MAX_SIN_LATITUDE, TILE_SIZE};
pub use offline::{
    MapScale, OfflineMapFrame, OfflineMapProjector, Raster, RasterSize, EARTH_RADIUS_M,
};

use serde::Serialize;
use thiserror::Error;

use crate::geo::GeoCoordinate;

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl std::fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Errors from projection operations.
///
/// Kept separate from [`crate::geo::CoordError`]: these are not bad inputs but
/// calls the projection does not implement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The requested operation is not implemented by this projection.
    #[error("Unsupported projection operation: {operation}")]
    Unsupported { operation: &'static str },
}

/// Common operations of a map projection.
pub trait MapProjection: Send + Sync {
    /// Converts a geographic coordinate to the projection's cartesian pixel space.
    fn to_cartesian(&self, coord: &GeoCoordinate) -> PixelPoint;

    /// Converts a cartesian point back to a geographic coordinate.
    fn to_geographic(&self, point: &PixelPoint) -> Result<GeoCoordinate, ProjectionError>;
}
