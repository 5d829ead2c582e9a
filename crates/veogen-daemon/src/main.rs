//! veogen daemon
//!
//! Accepts video generation jobs over HTTP, runs them against the fal.ai Veo3
//! queue and streams each task's progress to its subscribers over SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};

use veogen_daemon::gateway::FalClient;
use veogen_daemon::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "veogen-daemon")]
#[command(version, about = "veogen daemon - fal.ai Veo3 video generation relay")]
struct Args {
    /// TCP bind address
    #[arg(long, default_value = "127.0.0.1:3000", env = "VEOGEN_ADDR")]
    addr: SocketAddr,

    /// Project directory holding `.veogen/settings.json`
    #[arg(long, env = "VEOGEN_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Directory for staged image uploads
    #[arg(long, env = "VEOGEN_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Seconds between sweeps of finished tasks
    #[arg(long, default_value_t = 30, env = "VEOGEN_CLEANUP_INTERVAL")]
    cleanup_interval: u64,

    /// Log level filter for the daemon (e.g. "info", "debug", "warn").
    #[arg(long, default_value = "info", env = "VEOGEN_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "VEOGEN_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!("veogen_daemon={0},veogen_core={0}", args.log_level);
    veogen_core::tracing_init::init_tracing(&log_filter, args.log_json);

    let mut config = veogen_core::config::load_config(args.project_dir.as_deref())?;
    if let Some(dir) = args.temp_dir {
        config.server.temp_dir = dir;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        model = %config.gateway.model,
        timeout_secs = config.gateway.timeout_secs,
        temp_dir = %config.server.temp_dir.display(),
        "Starting veogen-daemon"
    );

    let api_key = config.credentials.require_api_key()?;
    let gateway = Arc::new(FalClient::new(&config.gateway, api_key)?);
    let state = AppState::from_config(&config, gateway);

    let registry = Arc::clone(state.relay.registry());
    let cleanup_interval = Duration::from_secs(args.cleanup_interval.max(1));
    let cleanup_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        loop {
            ticker.tick().await;
            let expired = registry.cleanup_expired().await;
            if !expired.is_empty() {
                debug!(count = expired.len(), "Swept finished tasks");
            }
        }
    });

    server::serve(args.addr, state, shutdown_signal()).await?;

    cleanup_handle.abort();
    info!("Daemon stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        () = sigterm => {
            info!("Received SIGTERM shutdown signal");
        }
    }
}
