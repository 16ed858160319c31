//! Compass sensor fusion.
//!
//! Turns gravity/accelerometer, magnetometer and rotation-vector samples plus
//! location fixes into:
//!
//! - **Bearing reports**: how far the device must turn to face a target,
//!   debounced and tagged with magnetometer accuracy
//! - **Rotation updates**: the device-to-world matrix for the AR overlay
//!
//! # Architecture
//!
//! ```text
//! SensorHub / LocationSource ──samples──► SensorFusionEngine ──► Subscriber
//!          ▲                                   ▲                 (Location,
//!          └──────── register on start() ──────┘                  Bearing,
//!                                                                 Rotation)
//! ```
//!
//! Samples reach the engine either through its `on_*` methods or through an
//! [`EngineDriver`] draining a channel of [`SensorEvent`]s.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use getmethere::compass::*;
//!
//! let engine = SensorFusionEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(StaticSensorHub::all()),
//!     Arc::new(ManualLocationSource::default()),
//! );
//! engine.bind(Subscriber::Bearing(Arc::new(MyNeedle)));
//! engine.track(target);
//! let capability = engine.start();
//! ```

mod accuracy;
mod config;
mod declination;
mod driver;
mod engine;
mod orientation;
mod providers;
mod sinks;
mod types;

pub use accuracy::{AccuracyClass, DEFAULT_CALIBRATION_LEVEL};
pub use config::{EngineConfig, DEFAULT_LOCATION_INTERVAL, DEFAULT_MIN_ANGLE_CHANGE_DEG};
pub use declination::{
    DeclinationModel, DipoleDeclination, ZeroDeclination, GEOMAGNETIC_POLE_LAT,
    GEOMAGNETIC_POLE_LON,
};
pub use driver::{EngineDriver, SensorEvent};
pub use engine::SensorFusionEngine;
pub use orientation::{rotation_from_vector, rotation_matrix, Orientation};
pub use providers::{
    LocationRequest, LocationSource, ManualLocationSource, SamplingRate, SensorHub, SensorKind,
    StaticSensorHub,
};
pub use sinks::{BearingSink, LocationSink, RotationSink, Subscriber};
pub use types::{BearingReport, Capability, EngineState, LocationFix, OrientationSource};
