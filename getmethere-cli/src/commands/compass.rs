//! `compass` command: feed one sensor snapshot through the fusion engine.

use std::sync::mpsc;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use getmethere::compass::{
    BearingReport, BearingSink, DeclinationModel, DipoleDeclination, LocationFix, LocationSink,
    ManualLocationSource, SensorFusionEngine, SensorKind, StaticSensorHub, Subscriber,
    ZeroDeclination,
};
use getmethere::config::ConfigFile;
use getmethere::geo::GeoCoordinate;
use serde_json::json;

use super::common::{emit, parse_coordinate, parse_vector3};
use crate::error::CliError;

/// Magnetic declination model selection.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum DeclinationChoice {
    /// Centered geomagnetic dipole
    Dipole,
    /// Magnetic north is true north
    Zero,
}

impl DeclinationChoice {
    fn model(self) -> Arc<dyn DeclinationModel> {
        match self {
            DeclinationChoice::Dipole => Arc::new(DipoleDeclination::default()),
            DeclinationChoice::Zero => Arc::new(ZeroDeclination),
        }
    }
}

#[derive(Debug, Args)]
pub struct CompassArgs {
    /// Device location as lat,lon[,alt] or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub location: GeoCoordinate,

    /// Target as lat,lon[,alt] or geo: URI
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub target: GeoCoordinate,

    /// Gravity vector x,y,z in device coordinates (m/s²)
    #[arg(long, value_parser = parse_vector3, allow_hyphen_values = true, default_value = "0,0,9.81")]
    pub gravity: [f64; 3],

    /// Magnetic field vector x,y,z in device coordinates (µT)
    #[arg(long, value_parser = parse_vector3, allow_hyphen_values = true)]
    pub magnetic: [f64; 3],

    /// Treat --gravity as a raw accelerometer sample (no gravity sensor)
    #[arg(long)]
    pub accelerometer: bool,

    /// Magnetometer calibration level (0-4)
    #[arg(long, default_value_t = 4)]
    pub accuracy: u8,

    /// Declination model
    #[arg(long, value_enum, default_value_t = DeclinationChoice::Dipole)]
    pub declination: DeclinationChoice,
}

/// Forwards bearing reports to a channel.
struct ReportChannel {
    tx: mpsc::Sender<BearingReport>,
}

impl LocationSink for ReportChannel {
    fn on_tracking_new_location(&self, target: &GeoCoordinate) {
        tracing::debug!(destination = %target, "Tracking");
    }

    fn on_new_location(&self, fix: &LocationFix) {
        tracing::debug!(location = %fix.coordinate, "Location accepted");
    }
}

impl BearingSink for ReportChannel {
    fn on_bearing_update(&self, report: &BearingReport) {
        // Receiver may already be gone
        let _ = self.tx.send(*report);
    }
}

/// Run the engine over a single snapshot and print the report.
pub fn run(args: CompassArgs, config: &ConfigFile, json: bool) -> Result<(), CliError> {
    let hub = if args.accelerometer {
        StaticSensorHub::new([SensorKind::Accelerometer, SensorKind::MagneticField])
    } else {
        StaticSensorHub::new([SensorKind::Gravity, SensorKind::MagneticField])
    };

    let engine = SensorFusionEngine::new(
        config.to_engine_config(),
        Arc::new(hub),
        Arc::new(ManualLocationSource::default()),
    )
    .with_declination(args.declination.model());

    let (tx, rx) = mpsc::channel();
    engine.bind(Subscriber::Bearing(Arc::new(ReportChannel { tx })));
    engine.track(args.target);

    let capability = engine.start();
    if capability.is_degraded() {
        return Err(CliError::Compass(format!(
            "providers unavailable: {:?}",
            capability
        )));
    }

    engine.on_magnetic_accuracy(args.accuracy);
    if args.accelerometer {
        engine.on_accelerometer(args.gravity);
    } else {
        engine.on_gravity(args.gravity);
    }
    engine.on_magnetic_field(args.magnetic);
    engine.on_location(LocationFix::now(args.location));

    let state = engine.state();
    engine.stop();

    let report = rx.try_recv().map_err(|_| {
        CliError::Compass(
            "no bearing produced; gravity and magnetic vectors are degenerate".to_string(),
        )
    })?;

    let value = json!({
        "capability": capability,
        "state": state,
        "report": report,
    });
    let text = format!(
        "Azimuth:           {:.2}°\nBearing to target: {:.2}°\nAccuracy:          {}\nState:             {}",
        report.azimuth_deg, report.bearing_to_target_deg, report.accuracy, state
    );
    emit(json, &value, &text)
}
