//! Shim binary that calls into the `roomsense` library's `inner_main`.
use clap::Parser as _;
use eyre::Result;
use roomsense::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Delegate to library entrypoint
    roomsense::inner_main(Cli::parse()).await
}
