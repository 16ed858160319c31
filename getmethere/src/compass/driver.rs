//! Channel-driven front end for the fusion engine.
//!
//! Platform callbacks often arrive on threads the host doesn't want to block.
//! Instead of calling the engine directly they can push [`SensorEvent`]s
//! into an unbounded channel that a single tokio task drains in order.
//!
//! # Example
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! let cancellation = CancellationToken::new();
//! let handle = EngineDriver::new(engine.clone()).spawn(rx, cancellation.clone());
//!
//! tx.send(SensorEvent::MagneticField([0.0, 22.0, -42.0]))?;
//!
//! cancellation.cancel();
//! let processed = handle.await?;
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{LocationFix, SensorFusionEngine};
use crate::geo::GeoCoordinate;

/// A tagged input for the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Gravity([f64; 3]),
    Accelerometer([f64; 3]),
    MagneticField([f64; 3]),
    /// Rotation vector `x, y, z[, w]`.
    RotationVector(Vec<f64>),
    /// Magnetometer calibration level (0-4).
    MagneticAccuracy(u8),
    Location(LocationFix),
    Track(GeoCoordinate),
}

/// Single consumer feeding events into a [`SensorFusionEngine`].
///
/// The driver does not start or stop the engine; it only delivers events.
pub struct EngineDriver {
    engine: Arc<SensorFusionEngine>,
}

impl EngineDriver {
    pub fn new(engine: Arc<SensorFusionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SensorFusionEngine> {
        &self.engine
    }

    /// Drain `events` until the channel closes or `cancellation` fires.
    ///
    /// Returns the number of events delivered.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<SensorEvent>,
        cancellation: CancellationToken,
    ) -> usize {
        info!("Engine driver started");
        let mut processed = 0usize;

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    debug!("Engine driver cancelled");
                    break;
                }

                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.engine.handle(event);
                    processed += 1;
                }
            }
        }

        info!(processed, "Engine driver stopped");
        processed
    }

    /// Run the driver on the current tokio runtime.
    pub fn spawn(
        self,
        events: mpsc::UnboundedReceiver<SensorEvent>,
        cancellation: CancellationToken,
    ) -> JoinHandle<usize> {
        tokio::spawn(self.run(events, cancellation))
    }
}
