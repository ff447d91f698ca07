//! Server startup and shutdown wiring.

use core::net::{IpAddr, SocketAddr};
use std::path::Path;

use eyre::WrapErr as _;
use tokio::{net::TcpListener, signal};
use tracing::info;

use crate::{config, http, state};

/// Resolves when a shutdown signal (SIGTERM or ctrl-c) is received.
pub(crate) async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to create SIGTERM signal handler");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = signal::ctrl_c() => {}
        }
    }
    #[cfg(not(unix))]
    {
        drop(signal::ctrl_c().await);
    }
}

/// Starts the service: loads config, spawns the sampling task, and serves
/// HTTP until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the bind address
/// is invalid, or the listener cannot be bound.
pub async fn start(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    bind_override: Option<&str>,
    simulate: bool,
) -> eyre::Result<()> {
    let config = config::load_or_default(config_path).await?;

    let (app_state, poller) = state::initialize_state(&config, simulate);

    let listen_port = port_override.unwrap_or(config.server.port);
    let bind_str = bind_override.unwrap_or(&config.server.bind);
    let listen_ip: IpAddr = bind_str
        .parse()
        .wrap_err_with(|| format!("Invalid bind address: {bind_str}"))?;
    let addr = SocketAddr::from((listen_ip, listen_port));

    let app = http::create_app(app_state);
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let server = axum::serve(listener, app);
    tokio::select! {
        res = server => res?,
        () = shutdown_signal() => {
            info!("Received shutdown, shutting down");
        }
    }

    // The sampling loop never ends on its own; tear it down with the server.
    poller.abort();

    Ok(())
}
