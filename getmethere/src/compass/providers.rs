//! Sensor and location provider seams.
//!
//! The engine never talks to hardware. It asks a [`SensorHub`] and a
//! [`LocationSource`] to start delivering samples, and the host feeds those
//! samples back through the engine's `on_*` methods (or an
//! [`EngineDriver`](super::EngineDriver) channel).

use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;

/// Sensors the engine may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Gravity,
    Accelerometer,
    MagneticField,
    RotationVector,
}

/// Requested delivery rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingRate {
    /// UI-grade rate, enough for a compass needle.
    Normal,
    /// As fast as the sensor allows; used for the AR overlay.
    Fastest,
}

/// Parameters for location updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    pub interval: Duration,
    pub min_displacement_m: Option<f64>,
}

/// Registers sensor listeners on the host platform.
pub trait SensorHub: Send + Sync {
    /// Start delivering samples for `kind`. Returns false when the sensor is
    /// missing or the registration was refused.
    fn register(&self, kind: SensorKind, rate: SamplingRate) -> bool;

    /// Stop delivering samples for `kind`.
    fn unregister(&self, kind: SensorKind);
}

/// Requests position updates from the host platform.
pub trait LocationSource: Send + Sync {
    /// Start delivering fixes. Returns false when location is unavailable or
    /// permission was denied.
    fn request_updates(&self, request: &LocationRequest) -> bool;

    fn remove_updates(&self);
}

/// A [`SensorHub`] with a fixed set of available sensors.
///
/// Samples are pushed by the owner; the hub only records which sensors are
/// currently registered.
#[derive(Debug, Default)]
pub struct StaticSensorHub {
    available: HashSet<SensorKind>,
    registered: Mutex<HashSet<SensorKind>>,
}

impl StaticSensorHub {
    pub fn new(available: impl IntoIterator<Item = SensorKind>) -> Self {
        Self {
            available: available.into_iter().collect(),
            registered: Mutex::new(HashSet::new()),
        }
    }

    /// Hub exposing every sensor kind.
    pub fn all() -> Self {
        Self::new([
            SensorKind::Gravity,
            SensorKind::Accelerometer,
            SensorKind::MagneticField,
            SensorKind::RotationVector,
        ])
    }

    pub fn is_registered(&self, kind: SensorKind) -> bool {
        self.registered.lock().contains(&kind)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.lock().len()
    }
}

impl SensorHub for StaticSensorHub {
    fn register(&self, kind: SensorKind, _rate: SamplingRate) -> bool {
        if !self.available.contains(&kind) {
            return false;
        }
        self.registered.lock().insert(kind);
        true
    }

    fn unregister(&self, kind: SensorKind) {
        self.registered.lock().remove(&kind);
    }
}

/// A [`LocationSource`] whose fixes are pushed by the owner.
#[derive(Debug)]
pub struct ManualLocationSource {
    available: bool,
    active: Mutex<Option<LocationRequest>>,
}

impl ManualLocationSource {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            active: Mutex::new(None),
        }
    }

    /// The request currently in force, if updates are active.
    pub fn active_request(&self) -> Option<LocationRequest> {
        *self.active.lock()
    }
}

impl Default for ManualLocationSource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LocationSource for ManualLocationSource {
    fn request_updates(&self, request: &LocationRequest) -> bool {
        if !self.available {
            return false;
        }
        *self.active.lock() = Some(*request);
        true
    }

    fn remove_updates(&self) {
        self.active.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_hub_rejects_missing_sensor() {
        let hub = StaticSensorHub::new([SensorKind::MagneticField]);
        assert!(!hub.register(SensorKind::Gravity, SamplingRate::Normal));
        assert!(hub.register(SensorKind::MagneticField, SamplingRate::Normal));
        assert!(hub.is_registered(SensorKind::MagneticField));

        hub.unregister(SensorKind::MagneticField);
        assert_eq!(hub.registered_count(), 0);
    }

    #[test]
    fn test_manual_source_tracks_request() {
        let source = ManualLocationSource::default();
        let request = LocationRequest {
            interval: Duration::from_secs(3),
            min_displacement_m: Some(10.0),
        };
        assert!(source.request_updates(&request));
        assert_eq!(source.active_request(), Some(request));

        source.remove_updates();
        assert!(source.active_request().is_none());
    }

    #[test]
    fn test_unavailable_source() {
        let source = ManualLocationSource::new(false);
        let request = LocationRequest {
            interval: Duration::from_secs(3),
            min_displacement_m: None,
        };
        assert!(!source.request_updates(&request));
        assert!(source.active_request().is_none());
    }
}
