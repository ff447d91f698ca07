//! Command-line interface definitions.

use clap::{Parser, ValueEnum};

/// Top-level command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Path to the configuration file; built-in defaults apply when omitted.
    #[arg(short, long, env = "ROOMSENSE_CONFIG")]
    pub config: Option<String>,

    /// Optional override for the listen port (overrides port in config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Optional override for the bind address (overrides bind in config)
    #[arg(long)]
    pub bind: Option<String>,

    /// Replace sensor and fan hardware with simulated devices.
    #[arg(long)]
    pub simulate: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Supported log output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
    Pretty,
}
