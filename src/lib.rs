//! Room climate service: cached DHT11 readings over HTTP plus bounded GPIO
//! fan cycles.
//!
//! Exposes `inner_main` so the shim binary can call into the service logic;
//! modules are public for use in integration tests.

extern crate alloc;
extern crate core;

pub mod cli;
pub mod config;
pub mod fan;
pub mod http;
pub mod poll;
pub mod reading;
pub mod run;
pub mod sensor;
pub mod state;

use std::path::PathBuf;

use eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cli::{Cli, LogFormat};

/// The service's main function; can be called from a shim binary.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the server
/// fails to start.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(ChronoLocal::rfc_3339());

    match invocation.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }

    let config_path = invocation.config.map(PathBuf::from);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        simulate = invocation.simulate,
        "Starting roomsense"
    );

    run::start(
        config_path.as_deref(),
        invocation.port,
        invocation.bind.as_deref(),
        invocation.simulate,
    )
    .await
}
