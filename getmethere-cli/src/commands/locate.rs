//! `parse` and `bearing` commands.

use clap::Args;
use getmethere::geo::GeoCoordinate;
use getmethere::uri::GeoUri;
use serde_json::json;

use super::common::{emit, parse_coordinate};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// URI such as geo:-23.605689,-46.664609
    pub uri: String,
}

#[derive(Debug, Args)]
pub struct BearingArgs {
    /// Observer as lat,lon[,alt] or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub from: GeoCoordinate,

    /// Target as lat,lon[,alt] or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub to: GeoCoordinate,
}

/// Parse a geo URI and print the coordinate.
pub fn run_parse(args: ParseArgs, json: bool) -> Result<(), CliError> {
    let uri = GeoUri::parse(&args.uri)?;

    let mut text = format!("Coordinate: {}", uri.coordinate);
    if let Some(label) = &uri.label {
        text.push_str(&format!("\nLabel:      {}", label));
    }

    emit(json, &serde_json::to_value(&uri)?, &text)
}

/// Print the initial bearing and distance between two points.
pub fn run_bearing(args: BearingArgs, json: bool) -> Result<(), CliError> {
    let bearing = args.from.bearing_to(&args.to);
    let distance = args.from.distance_to(&args.to);

    let value = json!({
        "from": args.from,
        "to": args.to,
        "bearing_deg": bearing,
        "distance_m": distance,
    });
    let text = format!("Bearing:  {:.2}°\nDistance: {:.1} m", bearing, distance);
    emit(json, &value, &text)
}
