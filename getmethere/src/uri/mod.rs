//! `geo:` URI parsing.
//!
//! Parses the compact form used by map intents:
//! `geo:<lat>,<lon>[,<alt>][?q=<lat>,<lon>[,<alt>](<label>)]`
//!
//! Examples:
//! - `geo:-23.605689,-46.664609`
//! - `geo:0,0?q=-33.4390426969755,-70.6447425484657(Park%20Plaza%20Apart%20Hotel)`
//!
//! The scheme is case-insensitive. When the query segment matches the `q=`
//! form its coordinates replace those of the path; a query in any other form
//! is ignored. Every number is validated on its own, and any failure rejects
//! the whole URI.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;

use crate::geo::{CoordError, GeoCoordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Error parsing a geo URI.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoUriError {
    /// Text doesn't match the `geo:` grammar.
    #[error("Not a geo URI: {0}")]
    InvalidPattern(String),

    /// A numeric group could not be parsed.
    #[error("Invalid number in geo URI: {0}")]
    InvalidNumber(String),

    /// A parsed value is out of range.
    #[error("Geo URI coordinate out of range: {0}")]
    OutOfRange(#[from] CoordError),
}

/// A parsed geo URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoUri {
    /// The effective coordinate (query values win over the path).
    pub coordinate: GeoCoordinate,
    /// Raw label from the `q=` query, without the parentheses.
    pub label: Option<String>,
}

impl GeoUri {
    /// Parse a geo URI.
    pub fn parse(text: &str) -> Result<Self, GeoUriError> {
        let captures = geo_uri_pattern()
            .captures(text)
            .ok_or_else(|| GeoUriError::InvalidPattern(text.to_string()))?;

        let mut parts = CoordinateParts::from_captures(&captures)?;
        let mut label = None;

        if let Some(query) = captures.get(4) {
            if let Some(query_captures) = query_pattern().captures(query.as_str()) {
                let query_parts = CoordinateParts::from_captures(&query_captures)?;
                parts.latitude = query_parts.latitude;
                parts.longitude = query_parts.longitude;
                if query_parts.altitude.is_some() {
                    parts.altitude = query_parts.altitude;
                }
                label = query_captures
                    .get(4)
                    .map(|m| m.as_str().to_string())
                    .filter(|s| !s.is_empty());
            }
        }

        Ok(Self {
            coordinate: parts.into_coordinate()?,
            label,
        })
    }
}

impl FromStr for GeoUri {
    type Err = GeoUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeoUri::parse(s)
    }
}

impl std::fmt::Display for GeoUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "geo:{}", self.coordinate)
    }
}

/// Parse a geo URI straight into a coordinate.
///
/// # Examples
///
/// ```
/// use getmethere::uri::parse_geo_uri;
///
/// let coord = parse_geo_uri("geo:-23.605689,-46.664609").unwrap();
/// assert_eq!(coord.latitude(), -23.605689);
/// assert_eq!(coord.longitude(), -46.664609);
/// assert_eq!(coord.altitude(), 0.0);
///
/// let coord = parse_geo_uri("geo:0,0?q=-33.439,-70.645(Label)").unwrap();
/// assert_eq!(coord.latitude(), -33.439);
/// ```
pub fn parse_geo_uri(text: &str) -> Result<GeoCoordinate, GeoUriError> {
    GeoUri::parse(text).map(|uri| uri.coordinate)
}

/// Path form.
///
/// - Group 1: latitude
/// - Group 2: longitude
/// - Group 3: optional altitude
/// - Group 4: optional raw query (after `?`)
fn geo_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^geo:([\-0-9.]+),([\-0-9.]+)(?:,([\-0-9.]+))?(?:\?(.*))?$")
            .expect("geo URI pattern is valid")
    })
}

/// Query form: `q=<lat>,<lon>[,<alt>](<label>)`, closing parenthesis optional.
///
/// The label may itself contain parentheses. Trailing `&` parameters after
/// the label are accepted and dropped.
fn query_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^q=([\-0-9.]+),([\-0-9.]+)(?:,([\-0-9.]+))?\((.*?)\)?(?:&.*)?$")
            .expect("geo URI query pattern is valid")
    })
}

/// Numeric groups of a match, validated one at a time.
struct CoordinateParts {
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
}

impl CoordinateParts {
    fn from_captures(captures: &Captures<'_>) -> Result<Self, GeoUriError> {
        let latitude = parse_group(captures, 1)?.unwrap_or(f64::NAN);
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude).into());
        }

        let longitude = parse_group(captures, 2)?.unwrap_or(f64::NAN);
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude).into());
        }

        let altitude = parse_group(captures, 3)?;
        if let Some(alt) = altitude {
            if alt < 0.0 {
                return Err(CoordError::InvalidAltitude(alt).into());
            }
        }

        Ok(Self {
            latitude,
            longitude,
            altitude,
        })
    }

    fn into_coordinate(self) -> Result<GeoCoordinate, GeoUriError> {
        Ok(GeoCoordinate::new(
            self.latitude,
            self.longitude,
            self.altitude.unwrap_or(0.0),
        )?)
    }
}

fn parse_group(captures: &Captures<'_>, index: usize) -> Result<Option<f64>, GeoUriError> {
    captures
        .get(index)
        .map(|m| {
            m.as_str()
                .parse::<f64>()
                .map_err(|_| GeoUriError::InvalidNumber(m.as_str().to_string()))
        })
        .transpose()
}
