//! GetMeThere - orientation and geodesy engine
//!
//! This library turns raw device sensor samples and geographic coordinates
//! into the things a "point me there" UI draws:
//!
//! - [`compass`]: sensor fusion producing debounced bearings to a target and
//!   device rotation matrices for an AR overlay
//! - [`geodesy`]: WGS84 geodetic → ECEF → local ENU transforms, plus camera
//!   placement of a target through a perspective frustum
//! - [`projection`]: Web Mercator pixel projection and placement of points
//!   and distance radii on a pre-rendered static map
//! - [`uri`]: `geo:` URI parsing
//! - [`config`]: INI configuration file
//!
//! # Example
//!
//! ```
//! use getmethere::geo::GeoCoordinate;
//! use getmethere::projection::{OfflineMapProjector, RasterSize};
//!
//! let center = GeoCoordinate::from_lat_lon(-23.605689, -46.664609).unwrap();
//! let projector = OfflineMapProjector::bind(&RasterSize::new(1200, 800), center, 15);
//!
//! let pixel = projector.project_to_pixel(&center);
//! assert_eq!((pixel.x, pixel.y), (600.0, 400.0));
//! ```

pub mod compass;
pub mod config;
pub mod geo;
pub mod geodesy;
pub mod projection;
pub mod uri;

pub use geo::{CoordError, GeoCoordinate};
