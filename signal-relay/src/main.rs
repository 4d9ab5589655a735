//! signal-relay binary entry point.
//!
//! Usage:
//! ```bash
//! signal-relay --config signal.toml
//! PORT=8080 signal-relay
//! ```

use anyhow::Context;
use signal_relay::config::Config;
use signal_relay::server::SignalRelay;
use signal_relay::session;
use signal_relay::sweeper::{spawn_stats_task, spawn_sweeper_task};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = load_config()?;
    config.apply_env();

    tracing::info!("signal-relay v{}", env!("CARGO_PKG_VERSION"));

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!("Listening on {}", config.server.bind_address);

    let relay = Arc::new(SignalRelay::new(config));
    let sweeper = spawn_sweeper_task(relay.clone(), relay.config().sweeper.clone());
    let stats = spawn_stats_task(relay.clone(), relay.config().stats.clone());

    tokio::select! {
        result = session::serve(relay.clone(), listener) => {
            result.context("accept loop failed")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    sweeper.abort();
    stats.abort();

    // Active sessions hold their own handles; the process exiting closes
    // them. Peers are expected to reconnect and re-register.
    let peers = relay.state().await.registry.len();
    tracing::info!(peers, "signal-relay stopped");
    Ok(())
}

/// Resolve Ctrl-C or SIGTERM, whichever lands first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn load_config() -> signal_relay::error::Result<Config> {
    match get_config_path() {
        Some(path) => Ok(Config::from_file(&path)?),
        None => Ok(Config::default()),
    }
}

fn get_config_path() -> Option<PathBuf> {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
}
