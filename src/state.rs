//! Application state shared across request handlers and background tasks.
//!
//! The readings cache is a `watch` channel: the polling task is the sole
//! writer, handlers take a `Copy` snapshot per query. No reader ever observes
//! a half-written reading, and reads never block on the poller.

use alloc::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    fan::{FanController, NoopFan, SysfsGpio},
    poll,
    reading::Reading,
    sensor::{IioDht, SimulatedProbe},
};

/// Sender for the most recent good reading; owned by the polling task.
pub type ReadingsTx = watch::Sender<Reading>;
/// Receiver for the most recent good reading.
pub type ReadingsRx = watch::Receiver<Reading>;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Snapshot source for the most recent good reading.
    pub readings_rx: ReadingsRx,

    /// Fan command surface.
    pub fan: Arc<FanController>,
}

impl AppState {
    /// Returns the most recent good reading, or the zero reading before the
    /// first successful sample. Never fails, never blocks on the poller.
    #[must_use]
    pub fn current_readings(&self) -> Reading {
        *self.readings_rx.borrow()
    }
}

/// Initializes shared state and spawns the sampling task.
///
/// With `simulate` set, hardware access is replaced by synthetic devices so
/// the service can run off-target.
#[must_use]
pub fn initialize_state(config: &Config, simulate: bool) -> (AppState, JoinHandle<()>) {
    let (readings_tx, readings_rx) = watch::channel(Reading::default());

    let (fan, poller) = if simulate {
        (
            FanController::new(Box::new(NoopFan), config.fan.cycle_ticks),
            poll::spawn(SimulatedProbe::default(), readings_tx),
        )
    } else {
        (
            FanController::new(Box::new(SysfsGpio::new(config.fan.gpio)), config.fan.cycle_ticks),
            poll::spawn(IioDht::new(&config.sensor.device), readings_tx),
        )
    };

    (
        AppState {
            readings_rx,
            fan: Arc::new(fan),
        },
        poller,
    )
}
