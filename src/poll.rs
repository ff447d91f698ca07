//! Background sampling loop feeding the readings cache.
//!
//! Runs for the life of the process on its own task. Failed samples are
//! dropped and retried on the next cycle with no backoff and no failure
//! counter; the cache keeps serving the last good reading (or the zero
//! reading, if none has ever succeeded).

use core::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{reading::Reading, sensor::SensorProbe, state::ReadingsTx};

/// Fixed cadence between samples.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Spawns the sampling loop, transferring the probe and the cache's sender
/// half to it. The probe is owned by the loop, so no other device access can
/// race a read in progress.
///
/// The loop never ends on its own; the returned handle is aborted at
/// shutdown.
pub fn spawn<P>(probe: P, readings_tx: ReadingsTx) -> JoinHandle<()>
where
    P: SensorProbe + Send + 'static,
{
    tokio::spawn(async move {
        run(probe, readings_tx).await;
    })
}

async fn run<P: SensorProbe>(mut probe: P, readings_tx: ReadingsTx) {
    // First sample immediately, so a reading is available as soon as the
    // sensor cooperates.
    loop {
        poll_once(&mut probe, &readings_tx).await;
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// One cycle: sample, publish on success, leave the cache untouched on any
/// failure.
async fn poll_once<P: SensorProbe>(probe: &mut P, readings_tx: &ReadingsTx) {
    match probe.sample().await {
        Ok(sample) => {
            let reading = Reading::from_sample(&sample);
            let is_new = *readings_tx.borrow() != reading;
            if is_new {
                info!(?reading, "readings changed");
            } else {
                debug!("no change in readings");
            }
            readings_tx.send_replace(reading);
        }
        Err(err) => {
            debug!(%err, "sensor read failed, keeping last good reading");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use tokio::sync::watch;

    use super::*;
    use crate::reading::RawSample;
    use crate::sensor::SensorError;

    struct ScriptedProbe {
        steps: VecDeque<Result<RawSample, SensorError>>,
    }

    impl<const N: usize> From<[Result<RawSample, SensorError>; N]> for ScriptedProbe {
        fn from(steps: [Result<RawSample, SensorError>; N]) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl SensorProbe for ScriptedProbe {
        async fn sample(&mut self) -> Result<RawSample, SensorError> {
            self.steps.pop_front().expect("probe script exhausted")
        }
    }

    fn ok(temperature_c: f64, humidity: f64) -> Result<RawSample, SensorError> {
        Ok(RawSample {
            temperature_c,
            humidity,
        })
    }

    fn fail() -> Result<RawSample, SensorError> {
        Err(SensorError::Transient(io::Error::new(
            io::ErrorKind::TimedOut,
            "dht timeout",
        )))
    }

    fn incomplete() -> Result<RawSample, SensorError> {
        Err(SensorError::Incomplete {
            channel: "humidity",
            source: io::Error::new(io::ErrorKind::TimedOut, "dht timeout"),
        })
    }

    #[tokio::test]
    async fn failures_before_first_success_leave_the_zero_reading() {
        let (tx, rx) = watch::channel(Reading::default());
        let mut probe = ScriptedProbe::from([fail(), fail()]);

        poll_once(&mut probe, &tx).await;
        assert_eq!(*rx.borrow(), Reading::default());
        poll_once(&mut probe, &tx).await;
        assert_eq!(*rx.borrow(), Reading::default());
    }

    #[tokio::test]
    async fn failed_samples_keep_serving_the_last_good_reading() {
        let (tx, rx) = watch::channel(Reading::default());
        let mut probe = ScriptedProbe::from([fail(), ok(20.0, 55.0), fail(), fail()]);

        poll_once(&mut probe, &tx).await;
        assert_eq!(*rx.borrow(), Reading::default());

        poll_once(&mut probe, &tx).await;
        let good = Reading {
            temperature_c: 20.0,
            temperature_f: 68,
            humidity: 55.0,
        };
        assert_eq!(*rx.borrow(), good);

        poll_once(&mut probe, &tx).await;
        assert_eq!(*rx.borrow(), good);
        poll_once(&mut probe, &tx).await;
        assert_eq!(*rx.borrow(), good);
    }

    #[tokio::test]
    async fn incomplete_sample_never_mutates_the_cache() {
        let (tx, rx) = watch::channel(Reading::default());
        let mut probe = ScriptedProbe::from([ok(20.0, 55.0), incomplete()]);

        poll_once(&mut probe, &tx).await;
        let before = *rx.borrow();

        poll_once(&mut probe, &tx).await;
        assert_eq!(*rx.borrow(), before);
    }

    #[tokio::test]
    async fn successive_samples_replace_the_whole_reading() {
        let (tx, rx) = watch::channel(Reading::default());
        let mut probe = ScriptedProbe::from([ok(20.0, 55.0), ok(25.0, 40.0)]);

        poll_once(&mut probe, &tx).await;
        poll_once(&mut probe, &tx).await;

        assert_eq!(
            *rx.borrow(),
            Reading {
                temperature_c: 25.0,
                temperature_f: 77,
                humidity: 40.0,
            }
        );
    }
}
