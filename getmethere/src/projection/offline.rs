//! Offline map projector.
//!
//! An offline map is a single raster (for example a static-map snapshot)
//! whose center pixel corresponds to a known geographic coordinate at a known
//! zoom level. The projector caches the Mercator projection of that center
//! so each pixel query costs one projection.
//!
//! # Example
//!
//! ```
//! use getmethere::geo::GeoCoordinate;
//! use getmethere::projection::{OfflineMapProjector, RasterSize};
//!
//! let center = GeoCoordinate::from_lat_lon(-23.605689, -46.664609).unwrap();
//! let map = OfflineMapProjector::bind(&RasterSize::new(1200, 800), center, 15);
//!
//! let pixel = map.project_to_pixel(&center);
//! assert_eq!((pixel.x, pixel.y), (600.0, 400.0));
//! ```

use image::{DynamicImage, GenericImageView, RgbaImage};
use serde::Serialize;
use tracing::trace;

use super::{MapProjection, MercatorProjection, PixelPoint, TILE_SIZE};
use crate::geo::{GeoCoordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Spherical Earth radius used to turn ground distances into degrees.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Anything with pixel dimensions that can back an offline map.
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Bare raster dimensions, for callers that do not hold the decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Raster for RasterSize {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Raster for DynamicImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }
}

impl Raster for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }
}

/// Pixel density multiplier of a static-map raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MapScale {
    /// 1 raster pixel per world pixel.
    Normal,
    /// 2 raster pixels per world pixel.
    #[default]
    Enhanced,
    /// 3 raster pixels per world pixel.
    Premium,
}

impl MapScale {
    /// Numeric multiplier.
    pub fn factor(&self) -> u32 {
        match self {
            MapScale::Normal => 1,
            MapScale::Enhanced => 2,
            MapScale::Premium => 3,
        }
    }

    /// Map a numeric multiplier back to a scale.
    pub fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            1 => Some(MapScale::Normal),
            2 => Some(MapScale::Enhanced),
            3 => Some(MapScale::Premium),
            _ => None,
        }
    }
}

impl From<MapScale> for u32 {
    fn from(scale: MapScale) -> Self {
        scale.factor()
    }
}

/// Geometry of a bound raster, computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OfflineMapFrame {
    pub raster_width_px: u32,
    pub raster_height_px: u32,
    pub scale: u32,
    pub center_geo: GeoCoordinate,
    /// Raster pixel where `center_geo` is drawn (the raster center).
    pub center_pixel: PixelPoint,
    /// Cached Mercator world pixel of `center_geo`.
    pub center_cartesian: PixelPoint,
    pub zoom: u8,
    pub tile_size: u32,
}

/// Projects geographic coordinates and ground distances into a raster's pixels.
#[derive(Debug, Clone)]
pub struct OfflineMapProjector {
    frame: OfflineMapFrame,
    projection: MercatorProjection,
}

impl OfflineMapProjector {
    /// Create a projector for a raster.
    ///
    /// # Arguments
    ///
    /// * `raster` - The map image (only its dimensions are used)
    /// * `scale` - Raster pixels per world pixel (1, 2 or 3 for static maps)
    /// * `center_geo` - Geographic coordinate drawn at the raster center
    /// * `projection` - Mercator projection at the raster's zoom level
    pub fn new<R: Raster + ?Sized>(
        raster: &R,
        scale: u32,
        center_geo: GeoCoordinate,
        projection: MercatorProjection,
    ) -> Self {
        let center_cartesian = projection.to_cartesian(&center_geo);
        let frame = OfflineMapFrame {
            raster_width_px: raster.width(),
            raster_height_px: raster.height(),
            scale,
            center_geo,
            center_pixel: PixelPoint::new(
                raster.width() as f64 / 2.0,
                raster.height() as f64 / 2.0,
            ),
            center_cartesian,
            zoom: projection.zoom(),
            tile_size: projection.tile_size(),
        };

        trace!(
            width = frame.raster_width_px,
            height = frame.raster_height_px,
            zoom = frame.zoom,
            scale = frame.scale,
            center = %center_geo,
            "Offline map bound"
        );

        Self { frame, projection }
    }

    /// Bind a raster delivered with its center and zoom, using 256px tiles
    /// and the default [`MapScale::Enhanced`] density.
    pub fn bind<R: Raster + ?Sized>(raster: &R, center_geo: GeoCoordinate, zoom: u8) -> Self {
        Self::bind_with_scale(raster, center_geo, zoom, MapScale::default())
    }

    /// Bind a raster with an explicit density.
    pub fn bind_with_scale<R: Raster + ?Sized>(
        raster: &R,
        center_geo: GeoCoordinate,
        zoom: u8,
        scale: MapScale,
    ) -> Self {
        Self::new(
            raster,
            scale.factor(),
            center_geo,
            MercatorProjection::new(zoom, TILE_SIZE),
        )
    }

    /// The immutable frame geometry.
    pub fn frame(&self) -> &OfflineMapFrame {
        &self.frame
    }

    /// Geographic center of the map.
    pub fn center_geo(&self) -> &GeoCoordinate {
        &self.frame.center_geo
    }

    /// Projects a geographic coordinate to a raster pixel position.
    pub fn project_to_pixel(&self, coord: &GeoCoordinate) -> PixelPoint {
        let cartesian = self.projection.to_cartesian(coord);
        let scale = self.frame.scale as f64;
        PixelPoint::new(
            self.frame.center_pixel.x + (cartesian.x - self.frame.center_cartesian.x) * scale,
            self.frame.center_pixel.y + (cartesian.y - self.frame.center_cartesian.y) * scale,
        )
    }

    /// Approximates a ground radius around the center as a pixel radius.
    ///
    /// Uses an equirectangular local-tangent approximation on a spherical
    /// Earth, so it is only valid for radii that are small compared with the
    /// Earth and for centers away from the poles. Zero, negative or NaN radii
    /// yield 0.
    pub fn project_distance_from_center(&self, radius_m: f64) -> f64 {
        if !(radius_m > 0.0) {
            return 0.0;
        }

        let center = &self.frame.center_geo;
        let delta_lat = radius_m / EARTH_RADIUS_M;
        let delta_lon = radius_m / (EARTH_RADIUS_M * center.latitude().to_radians().cos());

        let lat = (center.latitude() + delta_lat.to_degrees()).clamp(MIN_LAT, MAX_LAT);
        let lon = (center.longitude() + delta_lon.to_degrees()).clamp(MIN_LON, MAX_LON);

        // Both values are clamped into range, altitude is the center's own
        let offset = match GeoCoordinate::new(lat, lon, center.altitude()) {
            Ok(coord) => coord,
            Err(_) => return 0.0,
        };

        let pixel = self.project_to_pixel(&offset);
        (pixel.x - self.frame.center_pixel.x).abs()
    }
}
