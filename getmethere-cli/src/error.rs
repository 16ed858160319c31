//! CLI error type.

use std::fmt;

use getmethere::config::ConfigError;
use getmethere::geo::CoordError;
use getmethere::uri::GeoUriError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line input.
    Input(String),
    /// Configuration file problem.
    Config(String),
    /// Coordinate or URI rejected by the library.
    Geo(String),
    /// Reading a raster image failed.
    Image(String),
    /// The compass engine could not run.
    Compass(String),
    /// Output serialization failed.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Input(msg) => write!(f, "Invalid input: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Geo(msg) => write!(f, "{}", msg),
            CliError::Image(msg) => write!(f, "Image error: {}", msg),
            CliError::Compass(msg) => write!(f, "Compass error: {}", msg),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Geo(e.to_string())
    }
}

impl From<GeoUriError> for CliError {
    fn from(e: GeoUriError) -> Self {
        CliError::Geo(e.to_string())
    }
}

impl From<image::ImageError> for CliError {
    fn from(e: image::ImageError) -> Self {
        CliError::Image(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
