//! Configuration types and loading.
//!
//! Every field is defaulted, so the service runs without any config file;
//! the defaults are the fixed values of the reference deployment (port 5000,
//! all interfaces, IIO device 0).

use std::path::Path;

use eyre::WrapErr as _;
use serde::Deserialize;
use tokio::fs;
use tracing::info;

/// Top-level service configuration.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub fan: FanConfig,
}

/// HTTP server binding configuration section.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// TCP port for the web service.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// Sensor access configuration section.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SensorConfig {
    /// Directory of the kernel DHT driver's IIO device.
    #[serde(default = "default_sensor_device")]
    pub device: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device: default_sensor_device(),
        }
    }
}

/// Fan control configuration section.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FanConfig {
    /// GPIO line driving the fan.
    #[serde(default = "default_fan_gpio")]
    pub gpio: u32,
    /// Number of one-second ticks a triggered fan cycle stays on.
    #[serde(default = "default_cycle_ticks")]
    pub cycle_ticks: u32,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            gpio: default_fan_gpio(),
            cycle_ticks: default_cycle_ticks(),
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_sensor_device() -> String {
    "/sys/bus/iio/devices/iio:device0".to_string()
}

fn default_fan_gpio() -> u32 {
    14
}

fn default_cycle_ticks() -> u32 {
    10
}

/// Reads and parses the service config from a TOML file.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub async fn load<P: AsRef<Path>>(path: P) -> eyre::Result<Config> {
    let path_ref = path.as_ref();
    let content = fs::read_to_string(&path).await.wrap_err(format!(
        "Failed to read config file at: {}",
        path_ref.display()
    ))?;
    let config: Config = toml::from_str(&content).wrap_err(format!(
        "Failed to parse config as TOML at: {}",
        path_ref.display()
    ))?;
    Ok(config)
}

/// Loads the config file when one was given, built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error only for an explicitly given path that cannot be loaded.
pub async fn load_or_default(path: Option<&Path>) -> eyre::Result<Config> {
    match path {
        Some(path) => load(path).await,
        None => {
            info!("No config file given, using built-in defaults");
            Ok(Config::default())
        }
    }
}
