//! sqlrelay: relay JSON-lines SQL requests to an in-memory SQLite database.
//!
//! # Usage
//!
//! ```bash
//! echo '{"id":1,"action":"open"}' | sqlrelay --log-level warn
//! ```
//!
//! Environment variables can also be used:
//! - `SQLRELAY_CHANNEL_SIZE`: Router request channel size
//! - `SQLRELAY_LOG_JSON`: Emit JSON logs
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context;
use sqlrelay::config::Config;
use sqlrelay::observability::tracing::init_tracing;
use sqlrelay::server::run_server;
use tokio::sync::watch;

fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging (stderr only, stdout carries responses)
    init_tracing(&config.log_level, config.log_json);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(relay(config));

    // The stdin reader may still be parked in a blocking read
    runtime.shutdown_background();
    result
}

async fn relay(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        channel_size = config.channel_size,
        max_line_bytes = config.max_line_bytes,
        "Starting sqlrelay"
    );

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        // Signal shutdown
        let _ = shutdown_tx_clone.send(true);
    });

    let stats = run_server(config, shutdown_rx)
        .await
        .context("relay failed")?;
    drop(shutdown_tx);

    tracing::info!(
        responses = stats.responses,
        failures = stats.failures,
        "sqlrelay shutdown complete"
    );
    Ok(())
}
