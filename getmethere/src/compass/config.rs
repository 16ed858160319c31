//! Fusion engine configuration.

use std::time::Duration;

use super::LocationRequest;

/// Default minimum change in bearing before a new report is emitted.
pub const DEFAULT_MIN_ANGLE_CHANGE_DEG: f64 = 5.0;

/// Default interval between location updates.
pub const DEFAULT_LOCATION_INTERVAL: Duration = Duration::from_millis(3000);

/// Configuration for [`SensorFusionEngine`](super::SensorFusionEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Reports closer than this to the last emitted bearing are dropped.
    pub min_angle_change_deg: f64,

    /// Requested interval between location fixes.
    pub location_interval: Duration,

    /// Fixes closer than this to the last accepted fix are dropped.
    pub min_displacement_m: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_angle_change_deg: DEFAULT_MIN_ANGLE_CHANGE_DEG,
            location_interval: DEFAULT_LOCATION_INTERVAL,
            min_displacement_m: None,
        }
    }
}

impl EngineConfig {
    /// Set the debounce threshold in degrees.
    pub fn with_min_angle_change(mut self, degrees: f64) -> Self {
        self.min_angle_change_deg = degrees;
        self
    }

    /// Set the location update interval.
    pub fn with_location_interval(mut self, interval: Duration) -> Self {
        self.location_interval = interval;
        self
    }

    /// Set the minimum displacement between accepted fixes.
    pub fn with_min_displacement(mut self, meters: f64) -> Self {
        self.min_displacement_m = Some(meters);
        self
    }

    /// The location request derived from this configuration.
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            interval: self.location_interval,
            min_displacement_m: self.min_displacement_m,
        }
    }
}
