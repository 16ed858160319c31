//! Subscriber roles notified by the fusion engine.
//!
//! Every subscriber hears about target changes and accepted location fixes.
//! Bearing and rotation updates only go to the roles that asked for them.

use std::sync::Arc;

use glam::DMat4;

use super::{BearingReport, LocationFix};
use crate::geo::GeoCoordinate;

/// Receives location-level events.
pub trait LocationSink: Send + Sync {
    /// A new target is being tracked.
    fn on_tracking_new_location(&self, target: &GeoCoordinate);

    /// A location fix was accepted.
    fn on_new_location(&self, fix: &LocationFix);
}

/// Receives debounced compass bearings.
pub trait BearingSink: LocationSink {
    fn on_bearing_update(&self, report: &BearingReport);
}

/// Receives device rotation matrices for the AR overlay.
pub trait RotationSink: LocationSink {
    /// `rotation` maps device coordinates to the world ENU frame.
    fn on_new_rotation(&self, rotation: &DMat4);
}

/// A subscriber registered with the engine, tagged by role.
#[derive(Clone)]
pub enum Subscriber {
    Location(Arc<dyn LocationSink>),
    Bearing(Arc<dyn BearingSink>),
    Rotation(Arc<dyn RotationSink>),
}

impl Subscriber {
    /// Whether this subscriber needs the rotation-vector sensor.
    pub fn wants_rotation(&self) -> bool {
        matches!(self, Subscriber::Rotation(_))
    }

    pub(crate) fn notify_target(&self, target: &GeoCoordinate) {
        match self {
            Subscriber::Location(sink) => sink.on_tracking_new_location(target),
            Subscriber::Bearing(sink) => sink.on_tracking_new_location(target),
            Subscriber::Rotation(sink) => sink.on_tracking_new_location(target),
        }
    }

    pub(crate) fn notify_location(&self, fix: &LocationFix) {
        match self {
            Subscriber::Location(sink) => sink.on_new_location(fix),
            Subscriber::Bearing(sink) => sink.on_new_location(fix),
            Subscriber::Rotation(sink) => sink.on_new_location(fix),
        }
    }

    pub(crate) fn notify_bearing(&self, report: &BearingReport) {
        if let Subscriber::Bearing(sink) = self {
            sink.on_bearing_update(report);
        }
    }

    pub(crate) fn notify_rotation(&self, rotation: &DMat4) {
        if let Subscriber::Rotation(sink) = self {
            sink.on_new_rotation(rotation);
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            Subscriber::Location(_) => "Location",
            Subscriber::Bearing(_) => "Bearing",
            Subscriber::Rotation(_) => "Rotation",
        };
        f.debug_tuple("Subscriber").field(&role).finish()
    }
}
