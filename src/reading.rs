//! Value objects for climate readings.
//!
//! A [`Reading`] is the triple served over HTTP; both temperature fields are
//! always derived together from one [`RawSample`], never updated
//! independently.

use serde::Serialize;

/// One successful sensor sample, both channels present.
///
/// The sensor either yields both values or the read counts as failed; there
/// is no partial sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

/// The most recent climate reading, as served to HTTP clients.
///
/// `Default` is the zero reading, served until the first sample succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Reading {
    pub temperature_c: f64,
    pub temperature_f: i32,
    pub humidity: f64,
}

impl Reading {
    /// Builds a reading from a raw sample, deriving the Fahrenheit value.
    #[must_use]
    pub fn from_sample(sample: &RawSample) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "rounded first, and sensor temperatures are far below i32 range"
        )]
        let temperature_f = (sample.temperature_c * 9.0 / 5.0 + 32.0).round() as i32;
        Self {
            temperature_c: sample.temperature_c,
            temperature_f,
            humidity: sample.humidity,
        }
    }
}
