//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::Args;
use getmethere::config::ConfigFile;
use getmethere::geo::GeoCoordinate;
use getmethere::projection::{MapScale, RasterSize};
use getmethere::uri::parse_geo_uri;

use crate::error::CliError;

/// Parse a coordinate argument.
///
/// Accepts either `lat,lon[,alt]` or a `geo:` URI.
pub fn parse_coordinate(s: &str) -> Result<GeoCoordinate, String> {
    let trimmed = s.trim();
    if trimmed.get(..4).is_some_and(|scheme| scheme.eq_ignore_ascii_case("geo:")) {
        return parse_geo_uri(trimmed).map_err(|e| e.to_string());
    }

    let values = parse_floats(trimmed)?;
    let coordinate = match values.as_slice() {
        [lat, lon] => GeoCoordinate::from_lat_lon(*lat, *lon),
        [lat, lon, alt] => GeoCoordinate::new(*lat, *lon, *alt),
        _ => return Err(format!("expected lat,lon[,alt], got '{}'", s)),
    };
    coordinate.map_err(|e| e.to_string())
}

/// Parse a sensor vector `x,y,z`.
pub fn parse_vector3(s: &str) -> Result<[f64; 3], String> {
    match parse_floats(s)?.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected x,y,z, got '{}'", s)),
    }
}

/// Parse a comma-separated list of numbers.
pub fn parse_floats(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part.trim()))
        })
        .collect()
}

/// Static-map raster options; unset values come from the `[map]` section.
#[derive(Debug, Clone, Args)]
pub struct MapArgs {
    /// Zoom level of the raster
    #[arg(long)]
    pub zoom: Option<u8>,

    /// Raster width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Raster height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Pixel density multiplier (1, 2 or 3)
    #[arg(long)]
    pub scale: Option<u32>,

    /// Read width and height from an image file instead
    #[arg(long, conflicts_with_all = ["width", "height"])]
    pub image: Option<PathBuf>,
}

/// Raster parameters after merging CLI options with the config file.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMap {
    pub raster: RasterSize,
    pub zoom: u8,
    pub scale: MapScale,
}

impl MapArgs {
    /// Merge with config; CLI takes precedence.
    pub fn resolve(&self, config: &ConfigFile) -> Result<ResolvedMap, CliError> {
        let raster = match &self.image {
            Some(path) => {
                let (width, height) = image::image_dimensions(path)?;
                RasterSize::new(width, height)
            }
            None => RasterSize::new(
                self.width.unwrap_or(config.map.width),
                self.height.unwrap_or(config.map.height),
            ),
        };

        let scale = match self.scale {
            Some(factor) => MapScale::from_factor(factor).ok_or_else(|| {
                CliError::Input(format!("scale must be 1, 2 or 3, got {}", factor))
            })?,
            None => config.map.scale,
        };

        Ok(ResolvedMap {
            raster,
            zoom: self.zoom.unwrap_or(config.map.zoom),
            scale,
        })
    }
}

/// Print `value` as pretty JSON, or `text` otherwise.
pub fn emit(json: bool, value: &serde_json::Value, text: &str) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}
