//! Addressable configuration keys (`section.key`).

use std::str::FromStr;

use super::{ConfigError, ConfigFile};
use crate::projection::MapScale;

/// A single setting in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CompassMinAngleChange,
    CompassLocationIntervalMs,
    CompassMinDisplacementM,
    MapZoom,
    MapWidth,
    MapHeight,
    MapScale,
}

impl ConfigKey {
    /// Every key, in file order.
    pub const ALL: [ConfigKey; 7] = [
        ConfigKey::CompassMinAngleChange,
        ConfigKey::CompassLocationIntervalMs,
        ConfigKey::CompassMinDisplacementM,
        ConfigKey::MapZoom,
        ConfigKey::MapWidth,
        ConfigKey::MapHeight,
        ConfigKey::MapScale,
    ];

    /// Section and key name.
    pub fn parts(&self) -> (&'static str, &'static str) {
        match self {
            ConfigKey::CompassMinAngleChange => ("compass", "min_angle_change"),
            ConfigKey::CompassLocationIntervalMs => ("compass", "location_interval_ms"),
            ConfigKey::CompassMinDisplacementM => ("compass", "min_displacement_m"),
            ConfigKey::MapZoom => ("map", "zoom"),
            ConfigKey::MapWidth => ("map", "width"),
            ConfigKey::MapHeight => ("map", "height"),
            ConfigKey::MapScale => ("map", "scale"),
        }
    }

    /// Current value rendered as it would appear in the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::CompassMinAngleChange => config.compass.min_angle_change.to_string(),
            ConfigKey::CompassLocationIntervalMs => config.compass.location_interval_ms.to_string(),
            ConfigKey::CompassMinDisplacementM => config
                .compass
                .min_displacement_m
                .map(|m| m.to_string())
                .unwrap_or_default(),
            ConfigKey::MapZoom => config.map.zoom.to_string(),
            ConfigKey::MapWidth => config.map.width.to_string(),
            ConfigKey::MapHeight => config.map.height.to_string(),
            ConfigKey::MapScale => config.map.scale.factor().to_string(),
        }
    }

    /// Parse `value` and store it in `config`.
    ///
    /// An empty value clears `compass.min_displacement_m`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let (section, key) = self.parts();
        let invalid = || ConfigError::InvalidValue {
            section,
            key,
            value: value.to_string(),
        };
        let value = value.trim();

        match self {
            ConfigKey::CompassMinAngleChange => {
                let degrees: f64 = value.parse().map_err(|_| invalid())?;
                if !(degrees >= 0.0) {
                    return Err(invalid());
                }
                config.compass.min_angle_change = degrees;
            }
            ConfigKey::CompassLocationIntervalMs => {
                config.compass.location_interval_ms = value.parse().map_err(|_| invalid())?;
            }
            ConfigKey::CompassMinDisplacementM => {
                config.compass.min_displacement_m = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(|_| invalid())?)
                };
            }
            ConfigKey::MapZoom => config.map.zoom = value.parse().map_err(|_| invalid())?,
            ConfigKey::MapWidth => config.map.width = value.parse().map_err(|_| invalid())?,
            ConfigKey::MapHeight => config.map.height = value.parse().map_err(|_| invalid())?,
            ConfigKey::MapScale => {
                let factor: u32 = value.parse().map_err(|_| invalid())?;
                config.map.scale = MapScale::from_factor(factor).ok_or_else(invalid)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| {
                let (section, name) = key.parts();
                wanted == format!("{}.{}", section, name)
            })
            .ok_or(())
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (section, key) = self.parts();
        write!(f, "{}.{}", section, key)
    }
}
