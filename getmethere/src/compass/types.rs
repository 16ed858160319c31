//! Value types produced and consumed by the fusion engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AccuracyClass;
use crate::geo::GeoCoordinate;

/// A position fix from the location provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinate: GeoCoordinate,
    /// Horizontal accuracy radius in meters, when the provider reports one.
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    /// Fix stamped with the current time and no accuracy estimate.
    pub fn now(coordinate: GeoCoordinate) -> Self {
        Self {
            coordinate,
            accuracy_m: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the accuracy radius.
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// A debounced compass update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BearingReport {
    /// Device azimuth minus the bearing to the target, in [0, 360).
    pub bearing_to_target_deg: f64,
    /// Declination-corrected azimuth of the device, in [0, 360).
    pub azimuth_deg: f64,
    pub accuracy: AccuracyClass,
    /// The fix the bearing was computed from.
    pub source_location: GeoCoordinate,
}

/// Lifecycle of the fusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Never started.
    Idle,
    /// Started, no usable orientation sample yet.
    AwaitingSensors,
    /// Orientation available, no location fix yet.
    AwaitingLocation,
    /// Orientation and location available.
    Active,
    /// Stopped explicitly or after failing to acquire providers.
    Stopped,
}

impl EngineState {
    /// Human-readable description for logging/UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::AwaitingSensors => "awaiting sensors",
            EngineState::AwaitingLocation => "awaiting location",
            EngineState::Active => "active",
            EngineState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which sensor pair drives the compass azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrientationSource {
    GravityMagnetic,
    AccelerometerMagnetic,
}

/// Providers acquired by `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capability {
    pub orientation: Option<OrientationSource>,
    pub rotation_vector: bool,
    pub location: bool,
}

impl Capability {
    /// Enough providers to produce any output.
    pub fn is_operational(&self) -> bool {
        self.location && (self.orientation.is_some() || self.rotation_vector)
    }

    /// Something requested could not be acquired.
    pub fn is_degraded(&self) -> bool {
        !self.is_operational()
    }
}
