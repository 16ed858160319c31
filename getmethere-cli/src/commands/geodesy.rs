//! `ecef`, `enu` and `ar` commands.

use clap::Args;
use getmethere::compass::rotation_from_vector;
use getmethere::geo::GeoCoordinate;
use getmethere::geodesy::ar::ArProjector;
use getmethere::geodesy::{enu_between, to_ecef};
use serde_json::json;

use super::common::{emit, parse_coordinate, parse_floats};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct EcefArgs {
    /// Point as lat,lon[,alt] or geo: URI
    #[arg(value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub coordinate: GeoCoordinate,
}

#[derive(Debug, Args)]
pub struct EnuArgs {
    /// Observer as lat,lon[,alt] or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub observer: GeoCoordinate,

    /// Target as lat,lon[,alt] or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub target: GeoCoordinate,
}

#[derive(Debug, Args)]
pub struct ArArgs {
    #[command(flatten)]
    pub points: EnuArgs,

    /// Rotation vector x,y,z[,w] from the device
    #[arg(long, allow_hyphen_values = true)]
    pub rotation: String,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1080)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 1920)]
    pub height: u32,
}

/// Print the ECEF position of a point.
pub fn run_ecef(args: EcefArgs, json: bool) -> Result<(), CliError> {
    let ecef = to_ecef(&args.coordinate);
    let text = format!(
        "x: {:.3} m\ny: {:.3} m\nz: {:.3} m",
        ecef.x, ecef.y, ecef.z
    );
    emit(json, &serde_json::to_value(ecef)?, &text)
}

/// Print the ENU vector from observer to target.
pub fn run_enu(args: EnuArgs, json: bool) -> Result<(), CliError> {
    let enu = enu_between(&args.observer, &args.target);
    let text = format!(
        "east:  {:.3} m\nnorth: {:.3} m\nup:    {:.3} m",
        enu.east, enu.north, enu.up
    );
    emit(json, &serde_json::to_value(enu)?, &text)
}

/// Place the target on a camera viewport.
pub fn run_ar(args: ArArgs, json: bool) -> Result<(), CliError> {
    let components = parse_floats(&args.rotation).map_err(CliError::Input)?;
    let rotation = rotation_from_vector(&components).ok_or_else(|| {
        CliError::Input("rotation vector needs 3 or 4 finite components".to_string())
    })?;

    let projector = ArProjector::for_viewport(args.width, args.height);
    let placement = projector.project(&rotation, &args.points.observer, &args.points.target);

    let text = match placement.screen {
        Some((x, y)) if placement.in_front => format!(
            "In front of camera\nScreen: ({:.3}, {:.3}) = ({:.0} px, {:.0} px)",
            x,
            y,
            x * args.width as f64,
            y * args.height as f64
        ),
        _ => "Behind camera".to_string(),
    };

    let value = json!({
        "placement": placement,
        "clip": placement.clip.to_array(),
    });
    emit(json, &value, &text)
}
