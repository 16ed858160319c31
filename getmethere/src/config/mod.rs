//! INI configuration file.
//!
//! Settings live in `<config_dir>/getmethere/config.ini`:
//!
//! ```ini
//! [compass]
//! min_angle_change = 5
//! location_interval_ms = 3000
//! min_displacement_m =
//!
//! [map]
//! zoom = 15
//! width = 600
//! height = 400
//! scale = 2
//! ```
//!
//! Missing files, sections and keys fall back to defaults. An empty
//! `min_displacement_m` disables the displacement filter.

mod keys;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::compass::{EngineConfig, DEFAULT_LOCATION_INTERVAL, DEFAULT_MIN_ANGLE_CHANGE_DEG};
use crate::projection::MapScale;

pub use keys::ConfigKey;

/// Directory name under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "getmethere";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default static-map zoom level.
pub const DEFAULT_MAP_ZOOM: u8 = 15;

/// Default static-map width in pixels.
pub const DEFAULT_MAP_WIDTH: u32 = 600;

/// Default static-map height in pixels.
pub const DEFAULT_MAP_HEIGHT: u32 = 400;

const SECTION_COMPASS: &str = "compass";
const SECTION_MAP: &str = "map";

/// Errors reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value for [{section}] {key}: {value:?}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

/// `[compass]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CompassSettings {
    pub min_angle_change: f64,
    pub location_interval_ms: u64,
    pub min_displacement_m: Option<f64>,
}

impl Default for CompassSettings {
    fn default() -> Self {
        Self {
            min_angle_change: DEFAULT_MIN_ANGLE_CHANGE_DEG,
            location_interval_ms: DEFAULT_LOCATION_INTERVAL.as_millis() as u64,
            min_displacement_m: None,
        }
    }
}

/// `[map]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub scale: MapScale,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_MAP_ZOOM,
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            scale: MapScale::default(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub compass: CompassSettings,
    pub map: MapSettings,
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults when the
    /// file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults when the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Write to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Write to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        self.to_ini().write_to_file(path).map_err(io_error)?;

        debug!(path = %path.display(), "Config file saved");
        Ok(())
    }

    /// Engine settings from the `[compass]` section.
    pub fn to_engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_min_angle_change(self.compass.min_angle_change)
            .with_location_interval(Duration::from_millis(self.compass.location_interval_ms));

        match self.compass.min_displacement_m {
            Some(meters) => config.with_min_displacement(meters),
            None => config,
        }
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_COMPASS))
            .set("min_angle_change", self.compass.min_angle_change.to_string())
            .set(
                "location_interval_ms",
                self.compass.location_interval_ms.to_string(),
            )
            .set(
                "min_displacement_m",
                self.compass
                    .min_displacement_m
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
            );
        ini.with_section(Some(SECTION_MAP))
            .set("zoom", self.map.zoom.to_string())
            .set("width", self.map.width.to_string())
            .set("height", self.map.height.to_string())
            .set("scale", self.map.scale.factor().to_string());
        ini
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(compass) = ini.section(Some(SECTION_COMPASS)) {
            if let Some(v) = compass.get("min_angle_change") {
                config.compass.min_angle_change =
                    parse_value(SECTION_COMPASS, "min_angle_change", v)?;
                if !(config.compass.min_angle_change >= 0.0) {
                    return Err(invalid(SECTION_COMPASS, "min_angle_change", v));
                }
            }
            if let Some(v) = compass.get("location_interval_ms") {
                config.compass.location_interval_ms =
                    parse_value(SECTION_COMPASS, "location_interval_ms", v)?;
            }
            if let Some(v) = compass.get("min_displacement_m") {
                config.compass.min_displacement_m = if v.trim().is_empty() {
                    None
                } else {
                    Some(parse_value(SECTION_COMPASS, "min_displacement_m", v)?)
                };
            }
        }

        if let Some(map) = ini.section(Some(SECTION_MAP)) {
            if let Some(v) = map.get("zoom") {
                config.map.zoom = parse_value(SECTION_MAP, "zoom", v)?;
            }
            if let Some(v) = map.get("width") {
                config.map.width = parse_value(SECTION_MAP, "width", v)?;
            }
            if let Some(v) = map.get("height") {
                config.map.height = parse_value(SECTION_MAP, "height", v)?;
            }
            if let Some(v) = map.get("scale") {
                let factor: u32 = parse_value(SECTION_MAP, "scale", v)?;
                config.map.scale =
                    MapScale::from_factor(factor).ok_or_else(|| invalid(SECTION_MAP, "scale", v))?;
            }
        }

        Ok(config)
    }
}

impl FromStr for ConfigFile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ini = Ini::load_from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }
}

/// Path of the config file in the platform config directory.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

fn parse_value<T: FromStr>(
    section: &'static str,
    key: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(section, key, value))
}

fn invalid(section: &'static str, key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
    }
}
