//! Fan control: bounded on-cycles on a GPIO line.
//!
//! A stuck-high fan output is the failure mode guarded against here: every
//! exit path of a cycle, including cancellation of the future and errors
//! while driving the pin, ends with the line driven low and released.

use core::time::Duration;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// Length of one on-cycle tick.
pub const FAN_TICK: Duration = Duration::from_secs(1);

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Failure modes of a fan cycle.
#[derive(Debug, Error)]
pub enum FanError {
    /// The GPIO line could not be claimed or configured.
    #[error("failed to claim fan GPIO line: {0}")]
    Claim(#[source] io::Error),

    /// The claimed line could not be driven.
    #[error("failed to drive fan GPIO line: {0}")]
    Drive(#[source] io::Error),

    /// Another cycle holds the pin. Overlapping cycles are rejected, not
    /// queued.
    #[error("a fan cycle is already running")]
    Busy,
}

/// A claimed digital output line.
pub trait FanPin: Send {
    /// Drives the line high.
    ///
    /// # Errors
    ///
    /// Returns [`FanError::Drive`] when the line cannot be written.
    fn set_high(&mut self) -> Result<(), FanError>;

    /// Drives the line low.
    ///
    /// # Errors
    ///
    /// Returns [`FanError::Drive`] when the line cannot be written.
    fn set_low(&mut self) -> Result<(), FanError>;
}

/// Capability to claim the fan's output line for one cycle.
///
/// The claim is scoped: dropping the returned pin releases the line.
pub trait FanBackend: Send + Sync {
    /// Claims the line, configured as an output.
    ///
    /// # Errors
    ///
    /// Returns [`FanError::Claim`] when the line is unavailable.
    fn claim(&self) -> Result<Box<dyn FanPin>, FanError>;
}

/// Backend using the sysfs GPIO interface.
///
/// The line is exported and configured per cycle and unexported when the
/// cycle's pin is dropped.
pub struct SysfsGpio {
    line: u32,
}

impl SysfsGpio {
    #[must_use]
    pub const fn new(line: u32) -> Self {
        Self { line }
    }
}

impl FanBackend for SysfsGpio {
    fn claim(&self) -> Result<Box<dyn FanPin>, FanError> {
        Ok(Box::new(SysfsPin::export(self.line)?))
    }
}

struct SysfsPin {
    line: u32,
    pin_dir: PathBuf,
}

impl SysfsPin {
    fn export(line: u32) -> Result<Self, FanError> {
        let root = Path::new(GPIO_ROOT);
        let pin_dir = root.join(format!("gpio{line}"));
        // Exporting an already-exported line fails with EBUSY.
        if !pin_dir.exists() {
            fs::write(root.join("export"), line.to_string()).map_err(FanError::Claim)?;
        }
        fs::write(pin_dir.join("direction"), "out").map_err(FanError::Claim)?;
        Ok(Self { line, pin_dir })
    }

    fn write_value(&self, value: &str) -> Result<(), FanError> {
        fs::write(self.pin_dir.join("value"), value).map_err(FanError::Drive)
    }
}

impl FanPin for SysfsPin {
    fn set_high(&mut self) -> Result<(), FanError> {
        self.write_value("1")
    }

    fn set_low(&mut self) -> Result<(), FanError> {
        self.write_value("0")
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if let Err(err) = fs::write(
            Path::new(GPIO_ROOT).join("unexport"),
            self.line.to_string(),
        ) {
            warn!(line = self.line, %err, "failed to unexport fan GPIO line");
        }
    }
}

/// Logging-only backend for simulated runs.
pub struct NoopFan;

impl FanBackend for NoopFan {
    fn claim(&self) -> Result<Box<dyn FanPin>, FanError> {
        Ok(Box::new(NoopPin))
    }
}

struct NoopPin;

impl FanPin for NoopPin {
    fn set_high(&mut self) -> Result<(), FanError> {
        tracing::info!("fan pin high (simulated)");
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), FanError> {
        tracing::info!("fan pin low (simulated)");
        Ok(())
    }
}

/// Drop guard around a claimed pin: whatever happens to the cycle, the pin
/// ends low before the line is released.
struct ActivePin {
    pin: Box<dyn FanPin>,
    released: bool,
}

impl ActivePin {
    fn claim(backend: &dyn FanBackend) -> Result<Self, FanError> {
        Ok(Self {
            pin: backend.claim()?,
            released: false,
        })
    }

    fn set_high(&mut self) -> Result<(), FanError> {
        self.pin.set_high()
    }

    fn shut_off(mut self) -> Result<(), FanError> {
        self.released = true;
        self.pin.set_low()
    }
}

impl Drop for ActivePin {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.pin.set_low() {
            error!(%err, "failed to drive fan pin low during cleanup");
        }
    }
}

/// Runs bounded fan cycles against a claimed output line.
pub struct FanController {
    backend: Box<dyn FanBackend>,
    busy: Mutex<()>,
    cycle_ticks: u32,
    tick: Duration,
}

impl FanController {
    #[must_use]
    pub fn new(backend: Box<dyn FanBackend>, cycle_ticks: u32) -> Self {
        Self {
            backend,
            busy: Mutex::new(()),
            cycle_ticks,
            tick: FAN_TICK,
        }
    }

    /// Configured tick count for HTTP-triggered cycles.
    #[must_use]
    pub const fn cycle_ticks(&self) -> u32 {
        self.cycle_ticks
    }

    /// Runs one cycle: claim the line, drive it high, hold for
    /// `on_duration_ticks` ticks, drive it low and release.
    ///
    /// Synchronous from the caller's perspective; the future resolves only
    /// once the pin is low again. If the future is cancelled mid-cycle the
    /// pin is still driven low before the line is released.
    ///
    /// # Errors
    ///
    /// Returns [`FanError::Busy`] while another cycle holds the pin, and
    /// [`FanError::Claim`] or [`FanError::Drive`] on hardware failures. After
    /// a drive failure the pin has still been forced low.
    pub async fn run_cycle(&self, on_duration_ticks: u32) -> Result<(), FanError> {
        let Ok(_cycle) = self.busy.try_lock() else {
            return Err(FanError::Busy);
        };

        let mut pin = ActivePin::claim(self.backend.as_ref())?;
        pin.set_high()?;
        for _ in 0..on_duration_ticks {
            tokio::time::sleep(self.tick).await;
        }
        pin.shut_off()
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PinEvent {
        Claimed,
        High,
        Low,
        Released,
    }

    #[derive(Clone, Default)]
    struct RecordingBackend {
        events: Arc<StdMutex<Vec<PinEvent>>>,
        fail_high: bool,
    }

    impl RecordingBackend {
        fn failing_high() -> Self {
            Self {
                fail_high: true,
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<PinEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl FanBackend for RecordingBackend {
        fn claim(&self) -> Result<Box<dyn FanPin>, FanError> {
            self.events.lock().unwrap().push(PinEvent::Claimed);
            Ok(Box::new(RecordingPin {
                events: self.events.clone(),
                fail_high: self.fail_high,
            }))
        }
    }

    struct RecordingPin {
        events: Arc<StdMutex<Vec<PinEvent>>>,
        fail_high: bool,
    }

    impl FanPin for RecordingPin {
        fn set_high(&mut self) -> Result<(), FanError> {
            if self.fail_high {
                return Err(FanError::Drive(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "value write rejected",
                )));
            }
            self.events.lock().unwrap().push(PinEvent::High);
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), FanError> {
            self.events.lock().unwrap().push(PinEvent::Low);
            Ok(())
        }
    }

    impl Drop for RecordingPin {
        fn drop(&mut self) {
            self.events.lock().unwrap().push(PinEvent::Released);
        }
    }

    fn controller(backend: RecordingBackend, cycle_ticks: u32, tick: Duration) -> FanController {
        FanController {
            backend: Box::new(backend),
            busy: Mutex::new(()),
            cycle_ticks,
            tick,
        }
    }

    async fn wait_for_high(backend: &RecordingBackend) {
        for _ in 0..100 {
            if backend.events().contains(&PinEvent::High) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("fan pin never went high");
    }

    #[tokio::test]
    async fn completed_cycle_ends_with_pin_low() {
        let backend = RecordingBackend::default();
        let fan = controller(backend.clone(), 3, Duration::from_millis(5));

        fan.run_cycle(3).await.unwrap();

        assert_eq!(
            backend.events(),
            vec![
                PinEvent::Claimed,
                PinEvent::High,
                PinEvent::Low,
                PinEvent::Released
            ]
        );
    }

    #[tokio::test]
    async fn zero_tick_cycle_still_pulses_and_ends_low() {
        let backend = RecordingBackend::default();
        let fan = controller(backend.clone(), 0, Duration::from_millis(5));

        fan.run_cycle(0).await.unwrap();

        assert_eq!(
            backend.events(),
            vec![
                PinEvent::Claimed,
                PinEvent::High,
                PinEvent::Low,
                PinEvent::Released
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_cycle_forces_pin_low() {
        let backend = RecordingBackend::default();
        let fan = Arc::new(controller(backend.clone(), 10, Duration::from_millis(50)));

        let cycle = tokio::spawn({
            let fan = Arc::clone(&fan);
            async move { fan.run_cycle(10).await }
        });

        wait_for_high(&backend).await;
        cycle.abort();
        let joined = cycle.await;
        assert!(joined.is_err_and(|err| err.is_cancelled()));

        assert_eq!(
            backend.events(),
            vec![
                PinEvent::Claimed,
                PinEvent::High,
                PinEvent::Low,
                PinEvent::Released
            ]
        );
    }

    #[tokio::test]
    async fn overlapping_cycle_is_rejected_as_busy() {
        let backend = RecordingBackend::default();
        let fan = Arc::new(controller(backend.clone(), 10, Duration::from_millis(50)));

        let cycle = tokio::spawn({
            let fan = Arc::clone(&fan);
            async move { fan.run_cycle(10).await }
        });

        wait_for_high(&backend).await;
        let second = fan.run_cycle(1).await;
        assert!(matches!(second, Err(FanError::Busy)));

        cycle.abort();
        let _joined = cycle.await;
    }

    #[tokio::test]
    async fn failed_high_still_forces_pin_low_before_returning() {
        let backend = RecordingBackend::failing_high();
        let fan = controller(backend.clone(), 3, Duration::from_millis(5));

        let result = fan.run_cycle(3).await;
        assert!(matches!(result, Err(FanError::Drive(_))));

        assert_eq!(
            backend.events(),
            vec![PinEvent::Claimed, PinEvent::Low, PinEvent::Released]
        );
    }

    #[tokio::test]
    async fn pin_is_free_again_after_a_cycle() {
        let backend = RecordingBackend::default();
        let fan = controller(backend.clone(), 1, Duration::from_millis(5));

        fan.run_cycle(1).await.unwrap();
        fan.run_cycle(1).await.unwrap();

        let claims = backend
            .events()
            .iter()
            .filter(|event| **event == PinEvent::Claimed)
            .count();
        assert_eq!(claims, 2);
    }
}
