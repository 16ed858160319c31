//! Web Mercator projection at a fixed zoom level.

use std::f64::consts::PI;

use super::{MapProjection, PixelPoint, ProjectionError};
use crate::geo::GeoCoordinate;

/// Size of a standard web-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Clamp applied to sin(latitude).
///
/// Truncating to 0.9999 limits latitude to about ±89.189°, roughly a third of
/// a tile past the edge of the world tile, and keeps the logarithm finite.
pub const MAX_SIN_LATITUDE: f64 = 0.9999;

/// Mercator projection producing world pixel coordinates at a zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MercatorProjection {
    zoom: u8,
    tile_size: u32,
}

impl MercatorProjection {
    /// Create a projection for the given zoom level and tile size.
    pub fn new(zoom: u8, tile_size: u32) -> Self {
        Self { zoom, tile_size }
    }

    /// Create a projection using the standard 256px tile size.
    pub fn with_zoom(zoom: u8) -> Self {
        Self::new(zoom, TILE_SIZE)
    }

    /// Zoom level of this projection.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Width (and height) of the whole world in pixels at this zoom.
    pub fn world_size(&self) -> f64 {
        self.tile_size as f64 * 2.0_f64.powi(self.zoom as i32)
    }
}

impl MapProjection for MercatorProjection {
    fn to_cartesian(&self, coord: &GeoCoordinate) -> PixelPoint {
        let siny = coord
            .latitude()
            .to_radians()
            .sin()
            .clamp(-MAX_SIN_LATITUDE, MAX_SIN_LATITUDE);

        let tile_size = self.tile_size as f64;
        let world_x = tile_size * (0.5 + coord.longitude() / 360.0);
        let world_y = tile_size * (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * PI));

        let scale = 2.0_f64.powi(self.zoom as i32);

        PixelPoint::new((world_x * scale).floor(), (world_y * scale).floor())
    }

    fn to_geographic(&self, _point: &PixelPoint) -> Result<GeoCoordinate, ProjectionError> {
        Err(ProjectionError::Unsupported {
            operation: "inverse Mercator projection",
        })
    }
}
