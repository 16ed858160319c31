//! `project` and `radius` commands.

use clap::Args;
use getmethere::config::ConfigFile;
use getmethere::geo::GeoCoordinate;
use getmethere::projection::OfflineMapProjector;
use serde_json::json;

use super::common::{emit, parse_coordinate, MapArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Map center as lat,lon or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub center: GeoCoordinate,

    /// Points to place on the map
    #[arg(required = true, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub points: Vec<GeoCoordinate>,

    #[command(flatten)]
    pub map: MapArgs,
}

#[derive(Debug, Args)]
pub struct RadiusArgs {
    /// Map center as lat,lon or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub center: GeoCoordinate,

    /// Ground radius in meters
    #[arg(long)]
    pub meters: f64,

    #[command(flatten)]
    pub map: MapArgs,
}

fn projector(
    center: GeoCoordinate,
    map: &MapArgs,
    config: &ConfigFile,
) -> Result<OfflineMapProjector, CliError> {
    let resolved = map.resolve(config)?;
    Ok(OfflineMapProjector::bind_with_scale(
        &resolved.raster,
        center,
        resolved.zoom,
        resolved.scale,
    ))
}

/// Print the raster pixel of each point.
pub fn run_project(args: ProjectArgs, config: &ConfigFile, json: bool) -> Result<(), CliError> {
    let projector = projector(args.center, &args.map, config)?;

    let placed: Vec<_> = args
        .points
        .iter()
        .map(|point| (point, projector.project_to_pixel(point)))
        .collect();

    let text = placed
        .iter()
        .map(|(point, pixel)| format!("{} -> {}", point, pixel))
        .collect::<Vec<_>>()
        .join("\n");

    let value = json!({
        "frame": projector.frame(),
        "points": placed
            .iter()
            .map(|(point, pixel)| json!({ "coordinate": point, "pixel": pixel }))
            .collect::<Vec<_>>(),
    });
    emit(json, &value, &text)
}

/// Print the pixel radius of a ground distance around the center.
pub fn run_radius(args: RadiusArgs, config: &ConfigFile, json: bool) -> Result<(), CliError> {
    let projector = projector(args.center, &args.map, config)?;
    let radius_px = projector.project_distance_from_center(args.meters);

    let value = json!({
        "frame": projector.frame(),
        "radius_m": args.meters,
        "radius_px": radius_px,
    });
    let text = format!("{} m -> {:.1} px", args.meters, radius_px);
    emit(json, &value, &text)
}
