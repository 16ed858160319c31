//! Sensor fusion engine.
//!
//! Combines orientation samples, location fixes and a tracked target into
//! debounced compass bearings and AR rotation updates.
//!
//! # State Machine
//!
//! ```text
//! Idle --start()--> AwaitingSensors --orientation--> AwaitingLocation --fix--> Active
//!   \                  |                                                         |
//!    \--start() fails--+------------------------ stop() ------------------------+--> Stopped
//!
//! Stopped --start()--> AwaitingSensors ...
//! ```
//!
//! # Concurrency
//!
//! All fusion state sits behind one mutex. Each update runs under a re-entrant
//! cycle guard held from computation through delivery, so updates from
//! different threads never interleave and subscribers see reports in the
//! order they were computed. Reports are delivered after the state mutex is
//! released, so subscribers may call back into the engine (e.g. `track()`
//! from a bearing callback). Notifications raised by such a nested call are
//! queued and delivered once the current one has reached every subscriber.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use glam::{DMat4, DVec3};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, trace, warn};

use super::accuracy::{AccuracyClass, DEFAULT_CALIBRATION_LEVEL};
use super::config::EngineConfig;
use super::declination::{DeclinationModel, DipoleDeclination};
use super::driver::SensorEvent;
use super::orientation::{rotation_from_vector, Orientation};
use super::providers::{LocationSource, SamplingRate, SensorHub, SensorKind};
use super::sinks::Subscriber;
use super::types::{BearingReport, Capability, EngineState, LocationFix, OrientationSource};
use crate::geo::{angular_difference, normalize_degrees, GeoCoordinate};

/// Orchestrates sensors, location and target into compass output.
pub struct SensorFusionEngine {
    config: EngineConfig,
    sensors: Arc<dyn SensorHub>,
    locations: Arc<dyn LocationSource>,
    declination: Arc<dyn DeclinationModel>,
    state: Mutex<FusionState>,
    subscribers: RwLock<Vec<Subscriber>>,
    cycle: ReentrantMutex<RefCell<Outbox>>,
}

/// Notifications waiting for delivery on the thread holding the cycle guard.
#[derive(Default)]
struct Outbox {
    pending: VecDeque<Notification>,
    draining: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Starting,
    Running,
    Stopped,
}

/// Providers successfully acquired by `start()`.
#[derive(Debug, Clone, Copy, Default)]
struct Registrations {
    gravity: bool,
    accelerometer: bool,
    magnetic: bool,
    rotation_vector: bool,
    location: bool,
}

impl Registrations {
    fn capability(&self) -> Capability {
        let orientation = match (self.magnetic, self.gravity, self.accelerometer) {
            (true, true, _) => Some(OrientationSource::GravityMagnetic),
            (true, false, true) => Some(OrientationSource::AccelerometerMagnetic),
            _ => None,
        };
        Capability {
            orientation,
            rotation_vector: self.rotation_vector,
            location: self.location,
        }
    }

    fn sensors(&self) -> Vec<SensorKind> {
        [
            (self.gravity, SensorKind::Gravity),
            (self.accelerometer, SensorKind::Accelerometer),
            (self.magnetic, SensorKind::MagneticField),
            (self.rotation_vector, SensorKind::RotationVector),
        ]
        .into_iter()
        .filter_map(|(registered, kind)| registered.then_some(kind))
        .collect()
    }
}

#[derive(Debug)]
struct FusionState {
    phase: Phase,
    /// Bumped by every `start()`; a start finishing under a newer generation
    /// has been superseded.
    generation: u64,
    registrations: Registrations,
    target: Option<GeoCoordinate>,
    location: Option<LocationFix>,
    /// Gravity, or raw acceleration when no gravity sensor is registered.
    gravity: Option<DVec3>,
    magnetic: Option<DVec3>,
    rotation: Option<DMat4>,
    calibration: u8,
    last_bearing: Option<f64>,
}

impl FusionState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            registrations: Registrations::default(),
            target: None,
            location: None,
            gravity: None,
            magnetic: None,
            rotation: None,
            calibration: DEFAULT_CALIBRATION_LEVEL,
            last_bearing: None,
        }
    }

    /// Forget everything learned during a cycle. The target survives.
    fn reset_cycle(&mut self) {
        self.registrations = Registrations::default();
        self.location = None;
        self.gravity = None;
        self.magnetic = None;
        self.rotation = None;
        self.calibration = DEFAULT_CALIBRATION_LEVEL;
        self.last_bearing = None;
    }

    fn is_accepting(&self) -> bool {
        matches!(self.phase, Phase::Starting | Phase::Running)
    }

    fn has_orientation(&self) -> bool {
        (self.gravity.is_some() && self.magnetic.is_some()) || self.rotation.is_some()
    }

    fn engine_state(&self) -> EngineState {
        match self.phase {
            Phase::Idle => EngineState::Idle,
            Phase::Stopped => EngineState::Stopped,
            Phase::Starting | Phase::Running => {
                if !self.has_orientation() {
                    EngineState::AwaitingSensors
                } else if self.location.is_none() {
                    EngineState::AwaitingLocation
                } else {
                    EngineState::Active
                }
            }
        }
    }
}

/// Output computed under the lock, delivered after it is released.
enum Notification {
    Target(GeoCoordinate),
    Location(LocationFix),
    Bearing(BearingReport),
    Rotation(DMat4),
}

impl SensorFusionEngine {
    /// Create an engine using the default dipole declination model.
    ///
    /// # Arguments
    ///
    /// * `config` - Debounce and location request settings
    /// * `sensors` - Hub used to register orientation sensors
    /// * `locations` - Source of position fixes
    pub fn new(
        config: EngineConfig,
        sensors: Arc<dyn SensorHub>,
        locations: Arc<dyn LocationSource>,
    ) -> Self {
        Self {
            config,
            sensors,
            locations,
            declination: Arc::new(DipoleDeclination::default()),
            state: Mutex::new(FusionState::new()),
            subscribers: RwLock::new(Vec::new()),
            cycle: ReentrantMutex::new(RefCell::new(Outbox::default())),
        }
    }

    /// Replace the declination model.
    pub fn with_declination(mut self, model: Arc<dyn DeclinationModel>) -> Self {
        self.declination = model;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state.lock().engine_state()
    }

    /// Target currently tracked, if any.
    pub fn target(&self) -> Option<GeoCoordinate> {
        self.state.lock().target
    }

    /// Last accepted location fix of the current cycle.
    pub fn last_location(&self) -> Option<LocationFix> {
        self.state.lock().location
    }

    /// Register a subscriber.
    ///
    /// If a target is already tracked, the subscriber is told about it right
    /// away. Rotation subscribers should be bound before `start()`, which is
    /// when the rotation-vector sensor is requested.
    pub fn bind(&self, subscriber: Subscriber) {
        let target = self.state.lock().target;
        debug!(?subscriber, "Binding subscriber");
        self.subscribers.write().push(subscriber.clone());

        if let Some(target) = target {
            subscriber.notify_target(&target);
        }
    }

    /// Acquire providers and begin accepting samples.
    ///
    /// Without a location source, or without any usable orientation path, the
    /// engine releases whatever it acquired and moves to `Stopped`; the
    /// returned capability says what was missing. Calling `start()` on a
    /// running engine returns its current capability.
    pub fn start(&self) -> Capability {
        let generation = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Starting | Phase::Running => {
                    debug!("Fusion engine already started");
                    return state.registrations.capability();
                }
                Phase::Idle | Phase::Stopped => {
                    state.phase = Phase::Starting;
                    state.generation += 1;
                    state.generation
                }
            }
        };

        let wants_rotation = self
            .subscribers
            .read()
            .iter()
            .any(Subscriber::wants_rotation);

        // Providers may deliver synchronously, so register without the lock
        let mut registrations = Registrations {
            location: self
                .locations
                .request_updates(&self.config.location_request()),
            magnetic: self
                .sensors
                .register(SensorKind::MagneticField, SamplingRate::Normal),
            gravity: self
                .sensors
                .register(SensorKind::Gravity, SamplingRate::Normal),
            ..Registrations::default()
        };
        if !registrations.gravity {
            registrations.accelerometer = self
                .sensors
                .register(SensorKind::Accelerometer, SamplingRate::Normal);
        }
        if wants_rotation {
            registrations.rotation_vector = self
                .sensors
                .register(SensorKind::RotationVector, SamplingRate::Fastest);
        }

        let capability = registrations.capability();

        let mut state = self.state.lock();
        if state.generation != generation {
            // stop() and a newer start() ran meanwhile. Providers are keyed by
            // kind, so the newer start owns them now.
            debug!(generation, current = state.generation, "Superseded start abandoned");
            if state.phase == Phase::Stopped {
                drop(state);
                self.release(&registrations);
            }
            return capability;
        }
        if state.phase != Phase::Starting {
            // stop() raced with us
            drop(state);
            self.release(&registrations);
            return capability;
        }

        if capability.is_degraded() {
            state.reset_cycle();
            state.phase = Phase::Stopped;
            drop(state);
            self.release(&registrations);
            warn!(
                location = capability.location,
                orientation = ?capability.orientation,
                rotation_vector = capability.rotation_vector,
                "Fusion engine could not acquire providers"
            );
            return capability;
        }

        state.registrations = registrations;
        state.phase = Phase::Running;
        info!(
            orientation = ?capability.orientation,
            rotation_vector = capability.rotation_vector,
            "Fusion engine started"
        );
        capability
    }

    /// Release providers and forget samples, debounce memory and calibration.
    ///
    /// The tracked target is kept for the next `start()`.
    pub fn stop(&self) {
        let registrations = {
            let mut state = self.state.lock();
            if state.phase == Phase::Stopped {
                return;
            }
            let registrations = state.registrations;
            state.reset_cycle();
            state.phase = Phase::Stopped;
            registrations
        };

        self.release(&registrations);
        info!("Fusion engine stopped");
    }

    /// Track a new target.
    ///
    /// Subscribers are notified before any bearing computed against it.
    pub fn track(&self, target: GeoCoordinate) {
        let cycle = self.cycle.lock();
        let notifications = {
            let mut state = self.state.lock();
            state.target = Some(target);
            info!(destination = %target, "Tracking new location");

            let mut out = vec![Notification::Target(target)];
            if state.is_accepting() {
                out.extend(self.compute_bearing(&mut state).map(Notification::Bearing));
            }
            out
        };
        self.dispatch(&cycle, notifications);
    }

    /// Feed one tagged event.
    pub fn handle(&self, event: SensorEvent) {
        match event {
            SensorEvent::Gravity(values) => self.on_gravity(values),
            SensorEvent::Accelerometer(values) => self.on_accelerometer(values),
            SensorEvent::MagneticField(values) => self.on_magnetic_field(values),
            SensorEvent::RotationVector(values) => self.on_rotation_vector(&values),
            SensorEvent::MagneticAccuracy(level) => self.on_magnetic_accuracy(level),
            SensorEvent::Location(fix) => self.on_location(fix),
            SensorEvent::Track(target) => self.track(target),
        }
    }

    /// Gravity sample in device coordinates (m/s²).
    pub fn on_gravity(&self, values: [f64; 3]) {
        self.update(|engine, state, out| {
            state.gravity = Some(DVec3::from_array(values));
            out.extend(engine.compute_bearing(state).map(Notification::Bearing));
        });
    }

    /// Raw accelerometer sample, used only when no gravity sensor is registered.
    pub fn on_accelerometer(&self, values: [f64; 3]) {
        self.update(|engine, state, out| {
            if state.registrations.gravity {
                trace!("Ignoring accelerometer sample, gravity sensor active");
                return;
            }
            state.gravity = Some(DVec3::from_array(values));
            out.extend(engine.compute_bearing(state).map(Notification::Bearing));
        });
    }

    /// Geomagnetic field sample in device coordinates (µT).
    pub fn on_magnetic_field(&self, values: [f64; 3]) {
        self.update(|engine, state, out| {
            state.magnetic = Some(DVec3::from_array(values));
            out.extend(engine.compute_bearing(state).map(Notification::Bearing));
        });
    }

    /// Rotation-vector sample (`x, y, z[, w]`).
    ///
    /// Emits a rotation update once a location fix is known.
    pub fn on_rotation_vector(&self, values: &[f64]) {
        self.update(|_, state, out| {
            let Some(rotation) = rotation_from_vector(values) else {
                debug!(len = values.len(), "Invalid rotation vector sample");
                return;
            };
            state.rotation = Some(rotation);
            if state.location.is_some() {
                out.push(Notification::Rotation(rotation));
            }
        });
    }

    /// Magnetometer calibration level (0-4).
    pub fn on_magnetic_accuracy(&self, level: u8) {
        self.update(|_, state, _| {
            if state.calibration != level {
                debug!(
                    level,
                    accuracy = %AccuracyClass::from_calibration(level),
                    "Magnetometer accuracy changed"
                );
            }
            state.calibration = level;
        });
    }

    /// Location fix from the location source.
    pub fn on_location(&self, fix: LocationFix) {
        self.update(|engine, state, out| {
            if let (Some(min), Some(last)) = (engine.config.min_displacement_m, state.location) {
                let moved = last.coordinate.distance_to(&fix.coordinate);
                if moved < min {
                    trace!(moved, min, "Fix within minimum displacement, dropped");
                    return;
                }
            }

            state.location = Some(fix);
            out.push(Notification::Location(fix));
            out.extend(engine.compute_bearing(state).map(Notification::Bearing));
            out.extend(state.rotation.map(Notification::Rotation));
        });
    }

    /// Run `f` under the lock if samples are accepted, then dispatch.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&Self, &mut FusionState, &mut Vec<Notification>),
    {
        let cycle = self.cycle.lock();
        let notifications = {
            let mut state = self.state.lock();
            if !state.is_accepting() {
                trace!(phase = ?state.phase, "Sample ignored, engine not started");
                return;
            }
            let mut out = Vec::new();
            f(self, &mut *state, &mut out);
            out
        };
        self.dispatch(&cycle, notifications);
    }

    /// Compute the next bearing report, honoring the debounce threshold.
    fn compute_bearing(&self, state: &mut FusionState) -> Option<BearingReport> {
        let gravity = state.gravity?;
        let magnetic = state.magnetic?;
        let fix = state.location?;
        let target = state.target?;

        let Some(orientation) = Orientation::from_gravity_and_magnetic(gravity, magnetic) else {
            debug!("Degenerate orientation sample, no heading");
            return None;
        };

        let declination = self
            .declination
            .declination_deg(&fix.coordinate, Utc::now());
        let azimuth = normalize_degrees(orientation.azimuth_deg + declination);
        let bearing = fix.coordinate.bearing_to(&target);
        let relative = normalize_degrees(azimuth - bearing);

        if let Some(last) = state.last_bearing {
            let change = angular_difference(last, relative);
            if change <= self.config.min_angle_change_deg {
                trace!(change, "Bearing change below threshold");
                return None;
            }
        }
        state.last_bearing = Some(relative);

        Some(BearingReport {
            bearing_to_target_deg: relative,
            azimuth_deg: azimuth,
            accuracy: AccuracyClass::from_calibration(state.calibration),
            source_location: fix.coordinate,
        })
    }

    /// Deliver `notifications` in order. Must be called with the cycle guard
    /// held; a nested call only queues and the outermost call drains.
    fn dispatch(&self, outbox: &RefCell<Outbox>, notifications: Vec<Notification>) {
        {
            let mut outbox = outbox.borrow_mut();
            outbox.pending.extend(notifications);
            if outbox.draining || outbox.pending.is_empty() {
                return;
            }
            outbox.draining = true;
        }
        let _draining = DrainGuard(outbox);

        loop {
            let next = outbox.borrow_mut().pending.pop_front();
            let Some(notification) = next else { break };
            let subscribers = self.subscribers.read().clone();
            for subscriber in &subscribers {
                match &notification {
                    Notification::Target(target) => subscriber.notify_target(target),
                    Notification::Location(fix) => subscriber.notify_location(fix),
                    Notification::Bearing(report) => subscriber.notify_bearing(report),
                    Notification::Rotation(rotation) => subscriber.notify_rotation(rotation),
                }
            }
        }
    }

    fn release(&self, registrations: &Registrations) {
        for kind in registrations.sensors() {
            self.sensors.unregister(kind);
        }
        if registrations.location {
            self.locations.remove_updates();
        }
    }
}

/// Clears the draining flag even if a subscriber panics.
struct DrainGuard<'a>(&'a RefCell<Outbox>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let mut outbox = self.0.borrow_mut();
        outbox.draining = false;
        outbox.pending.clear();
    }
}

impl std::fmt::Debug for SensorFusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorFusionEngine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compass::declination::ZeroDeclination;
    use crate::compass::providers::{ManualLocationSource, StaticSensorHub};
    use crate::compass::sinks::{BearingSink, LocationSink, RotationSink};
    use std::sync::{mpsc, OnceLock, Weak};
    use std::thread;
    use std::time::Duration;

    const FLAT_GRAVITY: [f64; 3] = [0.0, 0.0, 9.81];

    fn coord(lat: f64, lon: f64) -> GeoCoordinate {
        GeoCoordinate::from_lat_lon(lat, lon).unwrap()
    }

    /// Magnetic sample for a flat device whose top edge points at `heading`.
    fn magnetic_for_heading(heading: f64) -> [f64; 3] {
        let rad = heading.to_radians();
        [-22.0 * rad.sin(), 22.0 * rad.cos(), -42.0]
    }

    #[derive(Default)]
    struct Recorder {
        targets: parking_lot::Mutex<Vec<GeoCoordinate>>,
        fixes: parking_lot::Mutex<Vec<LocationFix>>,
        bearings: parking_lot::Mutex<Vec<BearingReport>>,
        rotations: parking_lot::Mutex<Vec<DMat4>>,
    }

    impl Recorder {
        fn bearings(&self) -> Vec<f64> {
            self.bearings
                .lock()
                .iter()
                .map(|r| r.bearing_to_target_deg)
                .collect()
        }
    }

    impl LocationSink for Recorder {
        fn on_tracking_new_location(&self, target: &GeoCoordinate) {
            self.targets.lock().push(*target);
        }

        fn on_new_location(&self, fix: &LocationFix) {
            self.fixes.lock().push(*fix);
        }
    }

    impl BearingSink for Recorder {
        fn on_bearing_update(&self, report: &BearingReport) {
            self.bearings.lock().push(*report);
        }
    }

    impl RotationSink for Recorder {
        fn on_new_rotation(&self, rotation: &DMat4) {
            self.rotations.lock().push(*rotation);
        }
    }

    struct Fixture {
        engine: Arc<SensorFusionEngine>,
        hub: Arc<StaticSensorHub>,
        source: Arc<ManualLocationSource>,
        recorder: Arc<Recorder>,
    }

    fn fixture(config: EngineConfig) -> Fixture {
        fixture_with(config, StaticSensorHub::all(), ManualLocationSource::default())
    }

    fn fixture_with(
        config: EngineConfig,
        hub: StaticSensorHub,
        source: ManualLocationSource,
    ) -> Fixture {
        let hub = Arc::new(hub);
        let source = Arc::new(source);
        let engine = Arc::new(
            SensorFusionEngine::new(config, hub.clone(), source.clone())
                .with_declination(Arc::new(ZeroDeclination)),
        );
        let recorder = Arc::new(Recorder::default());
        engine.bind(Subscriber::Bearing(recorder.clone()));
        Fixture {
            engine,
            hub,
            source,
            recorder,
        }
    }

    #[test]
    fn test_reference_sample_produces_270() {
        let f = fixture(EngineConfig::default());
        f.engine.track(coord(0.0, 1.0));
        f.engine.start();

        f.engine.on_gravity([0.0, 9.8, 0.0]);
        f.engine.on_magnetic_field([0.0, 30.0, -40.0]);
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        let reports = f.recorder.bearings.lock().clone();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].azimuth_deg, 0.0);
        assert!((reports[0].bearing_to_target_deg - 270.0).abs() < 1e-9);
        // No calibration level reported yet
        assert_eq!(reports[0].accuracy, AccuracyClass::Unreliable);
        assert_eq!(reports[0].source_location, coord(0.0, 0.0));
    }

    #[test]
    fn test_state_progression() {
        let f = fixture(EngineConfig::default());
        assert_eq!(f.engine.state(), EngineState::Idle);

        let capability = f.engine.start();
        assert_eq!(capability.orientation, Some(OrientationSource::GravityMagnetic));
        assert!(capability.location);
        assert_eq!(f.engine.state(), EngineState::AwaitingSensors);

        f.engine.on_gravity(FLAT_GRAVITY);
        assert_eq!(f.engine.state(), EngineState::AwaitingSensors);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        assert_eq!(f.engine.state(), EngineState::AwaitingLocation);

        f.engine.on_location(LocationFix::now(coord(10.0, 10.0)));
        assert_eq!(f.engine.state(), EngineState::Active);

        f.engine.stop();
        assert_eq!(f.engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_no_report_without_target_or_fix() {
        let f = fixture(EngineConfig::default());
        f.engine.start();
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(30.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));
        assert!(f.recorder.bearings().is_empty(), "no target yet");

        f.engine.track(coord(1.0, 0.0));
        assert_eq!(f.recorder.bearings().len(), 1);
    }

    #[test]
    fn test_samples_ignored_before_start() {
        let f = fixture(EngineConfig::default());
        f.engine.track(coord(1.0, 0.0));
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        assert!(f.recorder.bearings().is_empty());
        assert!(f.recorder.fixes.lock().is_empty());
        assert_eq!(f.engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_debounce_with_wraparound() {
        let f = fixture(EngineConfig::default());
        f.engine.start();
        f.engine.track(coord(1.0, 0.0)); // due north, so bearing == azimuth
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        for heading in [0.0, 3.0, 4.9, 6.0, 359.0, 2.0, 10.0] {
            f.engine.on_magnetic_field(magnetic_for_heading(heading));
        }

        let emitted = f.recorder.bearings();
        let expected = [0.0, 6.0, 359.0, 10.0];
        assert_eq!(emitted.len(), expected.len(), "got {:?}", emitted);
        for (got, want) in emitted.iter().zip(expected) {
            assert!(angular_difference(*got, want) < 1e-6, "got {}, want {}", got, want);
        }
        for pair in emitted.windows(2) {
            assert!(angular_difference(pair[0], pair[1]) > 5.0);
        }
    }

    #[test]
    fn test_accuracy_tags_reports() {
        let f = fixture(EngineConfig::default().with_min_angle_change(0.0));
        f.engine.start();
        f.engine.track(coord(1.0, 0.0));
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        f.engine.on_magnetic_accuracy(0);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_magnetic_accuracy(3);
        f.engine.on_magnetic_field(magnetic_for_heading(20.0));

        let reports = f.recorder.bearings.lock().clone();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].accuracy, AccuracyClass::Unreliable);
        assert_eq!(reports[1].accuracy, AccuracyClass::Medium);
    }

    #[test]
    fn test_stop_resets_cycle() {
        let f = fixture(EngineConfig::default());
        f.engine.start();
        f.engine.track(coord(1.0, 0.0));
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_accuracy(3);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));
        assert_eq!(f.recorder.bearings().len(), 1);

        f.engine.stop();
        assert_eq!(f.hub.registered_count(), 0);
        assert!(f.source.active_request().is_none());
        assert!(f.engine.last_location().is_none());
        assert_eq!(f.engine.target(), Some(coord(1.0, 0.0)));

        // Same heading after restart is emitted again: debounce memory is gone
        f.engine.start();
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        let reports = f.recorder.bearings.lock().clone();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].accuracy, AccuracyClass::Medium);
        assert_eq!(reports[1].accuracy, AccuracyClass::Unreliable);
    }

    #[test]
    fn test_track_notifies_before_bearing() {
        let f = fixture(EngineConfig::default());
        f.engine.start();
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        f.engine.track(coord(0.0, 1.0));
        assert_eq!(f.recorder.targets.lock().as_slice(), &[coord(0.0, 1.0)]);
        assert_eq!(f.recorder.bearings().len(), 1);
        assert!((f.recorder.bearings()[0] - 270.0).abs() < 1e-6);
    }

    #[test]
    fn test_bind_after_track_receives_target() {
        let f = fixture(EngineConfig::default());
        f.engine.track(coord(5.0, 5.0));

        let late = Arc::new(Recorder::default());
        f.engine.bind(Subscriber::Location(late.clone()));
        assert_eq!(late.targets.lock().as_slice(), &[coord(5.0, 5.0)]);
    }

    #[test]
    fn test_location_subscriber_gets_no_bearings() {
        let f = fixture(EngineConfig::default());
        let location_only = Arc::new(Recorder::default());
        f.engine.bind(Subscriber::Location(location_only.clone()));

        f.engine.start();
        f.engine.track(coord(1.0, 0.0));
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        assert_eq!(location_only.fixes.lock().len(), 1);
        assert!(location_only.bearings().is_empty());
        assert_eq!(f.recorder.bearings().len(), 1);
    }

    #[test]
    fn test_min_displacement_filter() {
        let f = fixture(EngineConfig::default().with_min_displacement(100.0));
        f.engine.start();

        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));
        // ~11 m north
        f.engine.on_location(LocationFix::now(coord(0.0001, 0.0)));
        // ~1.1 km north
        f.engine.on_location(LocationFix::now(coord(0.01, 0.0)));

        let fixes = f.recorder.fixes.lock().clone();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[1].coordinate, coord(0.01, 0.0));
    }

    #[test]
    fn test_accelerometer_fallback() {
        let hub = StaticSensorHub::new([SensorKind::Accelerometer, SensorKind::MagneticField]);
        let f = fixture_with(EngineConfig::default(), hub, ManualLocationSource::default());

        let capability = f.engine.start();
        assert_eq!(
            capability.orientation,
            Some(OrientationSource::AccelerometerMagnetic)
        );

        f.engine.track(coord(1.0, 0.0));
        f.engine.on_accelerometer(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(90.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        let bearings = f.recorder.bearings();
        assert_eq!(bearings.len(), 1);
        assert!((bearings[0] - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_accelerometer_ignored_when_gravity_registered() {
        let f = fixture(EngineConfig::default());
        f.engine.start();
        f.engine.on_accelerometer(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        assert_eq!(f.engine.state(), EngineState::AwaitingSensors);
    }

    #[test]
    fn test_start_without_location_is_degraded() {
        let f = fixture_with(
            EngineConfig::default(),
            StaticSensorHub::all(),
            ManualLocationSource::new(false),
        );
        let capability = f.engine.start();
        assert!(capability.is_degraded());
        assert!(!capability.location);
        assert_eq!(f.engine.state(), EngineState::Stopped);
        assert_eq!(f.hub.registered_count(), 0, "acquired sensors released");
    }

    #[test]
    fn test_start_without_orientation_is_degraded() {
        let hub = StaticSensorHub::new([SensorKind::Gravity]);
        let f = fixture_with(EngineConfig::default(), hub, ManualLocationSource::default());
        let capability = f.engine.start();
        assert!(capability.orientation.is_none());
        assert!(capability.is_degraded());
        assert!(f.source.active_request().is_none());
    }

    #[test]
    fn test_start_is_idempotent() {
        let f = fixture(EngineConfig::default());
        let first = f.engine.start();
        let second = f.engine.start();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rotation_subscriber() {
        let f = fixture(EngineConfig::default());
        let ar = Arc::new(Recorder::default());
        f.engine.bind(Subscriber::Rotation(ar.clone()));

        let capability = f.engine.start();
        assert!(capability.rotation_vector);
        assert!(f.hub.is_registered(SensorKind::RotationVector));

        // No fix yet: rotation is stored, not emitted
        f.engine.on_rotation_vector(&[0.0, 0.0, 0.0, 1.0]);
        assert!(ar.rotations.lock().is_empty());
        assert_eq!(f.engine.state(), EngineState::AwaitingLocation);

        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));
        f.engine.on_rotation_vector(&[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(ar.rotations.lock().len(), 2, "first fix replays the stored rotation");
        assert!(ar.rotations.lock()[1].abs_diff_eq(DMat4::IDENTITY, 1e-12));
        assert!(f.recorder.bearings().is_empty());
    }

    #[test]
    fn test_new_fix_replays_latest_rotation() {
        let f = fixture(EngineConfig::default());
        let ar = Arc::new(Recorder::default());
        f.engine.bind(Subscriber::Rotation(ar.clone()));
        f.engine.start();

        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));
        assert!(ar.rotations.lock().is_empty(), "nothing to replay yet");

        let half = std::f64::consts::FRAC_PI_4;
        f.engine.on_rotation_vector(&[0.0, 0.0, half.sin(), half.cos()]);
        f.engine.on_location(LocationFix::now(coord(0.001, 0.0)));

        let rotations = ar.rotations.lock().clone();
        assert_eq!(rotations.len(), 2);
        assert!(rotations[1].abs_diff_eq(rotations[0], 1e-12));
        assert_eq!(ar.fixes.lock().len(), 2);
    }

    #[test]
    fn test_rotation_vector_not_requested_without_subscriber() {
        let f = fixture(EngineConfig::default());
        let capability = f.engine.start();
        assert!(!capability.rotation_vector);
        assert!(!f.hub.is_registered(SensorKind::RotationVector));
    }

    /// Retargets the engine from inside a bearing callback.
    struct Retargeter {
        engine: OnceLock<Weak<SensorFusionEngine>>,
        next: GeoCoordinate,
        calls: parking_lot::Mutex<usize>,
    }

    impl LocationSink for Retargeter {
        fn on_tracking_new_location(&self, _target: &GeoCoordinate) {}
        fn on_new_location(&self, _fix: &LocationFix) {}
    }

    impl BearingSink for Retargeter {
        fn on_bearing_update(&self, _report: &BearingReport) {
            let first = {
                let mut calls = self.calls.lock();
                *calls += 1;
                *calls == 1
            };
            if first {
                if let Some(engine) = self.engine.get().and_then(Weak::upgrade) {
                    engine.track(self.next);
                }
            }
        }
    }

    #[test]
    fn test_reentrant_track_from_callback() {
        let f = fixture(EngineConfig::default());
        let retargeter = Arc::new(Retargeter {
            engine: OnceLock::new(),
            next: coord(0.0, 1.0),
            calls: parking_lot::Mutex::new(0),
        });
        let _ = retargeter.engine.set(Arc::downgrade(&f.engine));
        f.engine.bind(Subscriber::Bearing(retargeter.clone()));

        f.engine.start();
        f.engine.track(coord(1.0, 0.0));
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));
        f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));

        assert_eq!(f.engine.target(), Some(coord(0.0, 1.0)));
        let bearings = f.recorder.bearings();
        assert_eq!(bearings.len(), 2);
        assert!((bearings[1] - 270.0).abs() < 1e-6);
    }

    /// Holds the first location notification until the test releases it.
    struct SlowSink {
        gate: parking_lot::Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
        bearings: parking_lot::Mutex<Vec<f64>>,
    }

    impl LocationSink for SlowSink {
        fn on_tracking_new_location(&self, _target: &GeoCoordinate) {}

        fn on_new_location(&self, _fix: &LocationFix) {
            let gate = self.gate.lock().take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.recv();
            }
        }
    }

    impl BearingSink for SlowSink {
        fn on_bearing_update(&self, report: &BearingReport) {
            self.bearings.lock().push(report.bearing_to_target_deg);
        }
    }

    #[test]
    fn test_concurrent_updates_delivered_in_order() {
        let f = fixture(EngineConfig::default());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let slow = Arc::new(SlowSink {
            gate: parking_lot::Mutex::new(Some((entered_tx, release_rx))),
            bearings: parking_lot::Mutex::new(Vec::new()),
        });
        f.engine.bind(Subscriber::Bearing(slow.clone()));

        f.engine.start();
        f.engine.track(coord(1.0, 0.0));
        f.engine.on_gravity(FLAT_GRAVITY);
        f.engine.on_magnetic_field(magnetic_for_heading(0.0));

        // Location thread computes bearing 0 and stalls while delivering it
        let location = {
            let engine = f.engine.clone();
            thread::spawn(move || engine.on_location(LocationFix::now(coord(0.0, 0.0))))
        };
        entered_rx.recv().unwrap();

        let sensors = {
            let engine = f.engine.clone();
            thread::spawn(move || {
                engine.on_magnetic_field(magnetic_for_heading(6.0));
                engine.on_magnetic_field(magnetic_for_heading(0.5));
            })
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
        location.join().unwrap();
        sensors.join().unwrap();

        for delivered in [slow.bearings.lock().clone(), f.recorder.bearings()] {
            assert_eq!(delivered.len(), 3, "got {:?}", delivered);
            assert!(angular_difference(delivered[0], 0.0) < 1e-6);
            assert!(angular_difference(delivered[2], 0.5) < 1e-6);
            for pair in delivered.windows(2) {
                assert!(angular_difference(pair[0], pair[1]) > 5.0, "got {:?}", delivered);
            }
        }
    }

    /// Blocks the first registration until the test releases it.
    struct GatedHub {
        inner: StaticSensorHub,
        gate: parking_lot::Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl SensorHub for GatedHub {
        fn register(&self, kind: SensorKind, rate: SamplingRate) -> bool {
            let gate = self.gate.lock().take();
            if let Some((entered, release)) = gate {
                let _ = entered.send(());
                let _ = release.recv();
            }
            self.inner.register(kind, rate)
        }

        fn unregister(&self, kind: SensorKind) {
            self.inner.unregister(kind);
        }
    }

    #[test]
    fn test_superseded_start_keeps_newer_registrations() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let hub = Arc::new(GatedHub {
            inner: StaticSensorHub::all(),
            gate: parking_lot::Mutex::new(Some((entered_tx, release_rx))),
        });
        let engine = Arc::new(SensorFusionEngine::new(
            EngineConfig::default(),
            hub.clone(),
            Arc::new(ManualLocationSource::default()),
        ));

        let first = {
            let engine = engine.clone();
            thread::spawn(move || engine.start())
        };
        entered_rx.recv().unwrap();

        engine.stop();
        assert!(!engine.start().is_degraded());
        release_tx.send(()).unwrap();
        first.join().unwrap();

        assert!(hub.inner.is_registered(SensorKind::MagneticField));
        assert!(hub.inner.is_registered(SensorKind::Gravity));
        assert_eq!(engine.state(), EngineState::AwaitingSensors);

        engine.stop();
        assert_eq!(hub.inner.registered_count(), 0);
    }

    #[test]
    fn test_abandoned_start_releases_when_stopped() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let hub = Arc::new(GatedHub {
            inner: StaticSensorHub::all(),
            gate: parking_lot::Mutex::new(Some((entered_tx, release_rx))),
        });
        let engine = Arc::new(SensorFusionEngine::new(
            EngineConfig::default(),
            hub.clone(),
            Arc::new(ManualLocationSource::default()),
        ));

        let first = {
            let engine = engine.clone();
            thread::spawn(move || engine.start())
        };
        entered_rx.recv().unwrap();
        engine.stop();
        release_tx.send(()).unwrap();
        first.join().unwrap();

        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(hub.inner.registered_count(), 0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_emitted_bearings_exceed_threshold(
                headings in prop::collection::vec(0.0..360.0_f64, 1..40),
                threshold in 0.5..30.0_f64,
            ) {
                let f = fixture(EngineConfig::default().with_min_angle_change(threshold));
                f.engine.start();
                f.engine.track(coord(1.0, 0.0));
                f.engine.on_gravity(FLAT_GRAVITY);
                f.engine.on_location(LocationFix::now(coord(0.0, 0.0)));
                for heading in &headings {
                    f.engine.on_magnetic_field(magnetic_for_heading(*heading));
                }

                let emitted = f.recorder.bearings();
                prop_assert!(!emitted.is_empty());
                for pair in emitted.windows(2) {
                    prop_assert!(angular_difference(pair[0], pair[1]) > threshold);
                }
                for bearing in &emitted {
                    prop_assert!((0.0..360.0).contains(bearing));
                }
            }
        }
    }
}
