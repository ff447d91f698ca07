//! Sensor access: the probe seam and the Linux IIO DHT adapter.
//!
//! A probe acquires the physical interface for exactly one read and releases
//! it on every exit path. DHT class sensors fail individual reads routinely
//! (bus timing, checksum), so probe errors are expected and non-fatal to the
//! caller.

use core::future::Future;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::reading::RawSample;

/// Channel file exposed by the kernel DHT driver, in millidegrees Celsius.
const TEMP_CHANNEL: &str = "in_temp_input";
/// Channel file exposed by the kernel DHT driver, in milli-percent.
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

/// Failure modes of a single sample attempt.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Whole-device failure: neither channel could be read. Routine for this
    /// sensor class; the caller retries on the next cycle.
    #[error("transient sensor failure: {0}")]
    Transient(#[source] io::Error),

    /// Exactly one channel came back. A partial sample is a complete
    /// failure: inconsistent half-readings are never stored.
    #[error("incomplete sample: {channel} channel failed")]
    Incomplete {
        channel: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Capability to take one blocking, fallible climate sample.
pub trait SensorProbe {
    /// Takes one sample, acquiring and releasing the device within the call.
    fn sample(&mut self) -> impl Future<Output = Result<RawSample, SensorError>> + Send;
}

/// Probe backed by the Linux IIO DHT driver's sysfs channel files.
///
/// The driver publishes integer milli-units; a failed hardware read surfaces
/// as an I/O error on the channel file. Files are opened and closed per
/// sample, so nothing is held between polling cycles.
pub struct IioDht {
    device_dir: PathBuf,
}

impl IioDht {
    #[must_use]
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    async fn read_channel(&self, channel: &'static str) -> Result<f64, io::Error> {
        let raw = tokio::fs::read_to_string(self.device_dir.join(channel)).await?;
        let milli: f64 = raw.trim().parse().map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unparseable {channel} value: {err}"),
            )
        })?;
        Ok(milli / 1000.0)
    }
}

impl SensorProbe for IioDht {
    async fn sample(&mut self) -> Result<RawSample, SensorError> {
        let temperature = self.read_channel(TEMP_CHANNEL).await;
        let humidity = self.read_channel(HUMIDITY_CHANNEL).await;

        match (temperature, humidity) {
            (Ok(temperature_c), Ok(humidity)) => Ok(RawSample {
                temperature_c,
                humidity,
            }),
            (Ok(_), Err(source)) => Err(SensorError::Incomplete {
                channel: "humidity",
                source,
            }),
            (Err(source), Ok(_)) => Err(SensorError::Incomplete {
                channel: "temperature",
                source,
            }),
            (Err(source), Err(_)) => Err(SensorError::Transient(source)),
        }
    }
}

/// Deterministic synthetic readings for running without sensor hardware.
#[derive(Debug, Default)]
pub struct SimulatedProbe {
    cycle: u32,
}

impl SensorProbe for SimulatedProbe {
    async fn sample(&mut self) -> Result<RawSample, SensorError> {
        self.cycle = self.cycle.wrapping_add(1);
        let phase = f64::from(self.cycle % 12);
        Ok(RawSample {
            temperature_c: 21.0 + phase * 0.25,
            humidity: 50.0 + phase,
        })
    }
}
