//! Mock quantum runtime server binary.
//!
//! # Configuration (environment variables)
//!
//! - `QRMOCK_ADDRESS`: listen address (default `0.0.0.0:8000`)
//! - `QRMOCK_API_KEY`: bearer token to require (any token when unset)
//! - `QRMOCK_CORS_ORIGINS`: comma-separated allowed origins, or `*`
//! - `QRMOCK_LOG_LEVEL`, `QRMOCK_LOG_FORMAT`: logging
//! - `QRMOCK_SWEEP_INTERVAL`: session expiry sweep period in seconds
//! - `QRMOCK_MAX_CONCURRENT_JOBS`, `QRMOCK_MAX_QUEUED_JOBS`: execution bounds
//! - `QRMOCK_ENGINE_LATENCY_MS`: artificial latency per job
//!
//! # Usage
//!
//! ```bash
//! qrmock-server --config qrmock.yaml --address 127.0.0.1:8000
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use qrmock_catalog::DeviceCatalog;
use qrmock_engine::SyntheticEngine;
use qrmock_server::rest::{AppState, auth::AuthState, rest_router};
use qrmock_server::{
    Config, JobEngine, SessionRegistry, TracingConfig, TracingFormat, init_start_time,
    init_tracing,
};

/// Mock Qiskit Runtime REST server for local SDK testing
#[derive(Parser, Debug)]
#[command(name = "qrmock-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "QRMOCK_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration
    #[arg(short, long)]
    address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (console, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    config.validate().context("invalid configuration")?;

    let format: TracingFormat = config.logging.format.parse().map_err(anyhow::Error::msg)?;
    init_tracing(TracingConfig::new(config.logging.level.clone(), format))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    init_start_time();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting qrmock server");
    info!(?config, "Configuration loaded");
    if config.server.api_key.is_none() {
        warn!("No API key configured (QRMOCK_API_KEY); any bearer token is accepted");
    }

    let catalog = Arc::new(DeviceCatalog::builtin());
    let sessions = Arc::new(SessionRegistry::new());
    let compute = SyntheticEngine::new()
        .with_latency(config.engine.latency())
        .with_seed(config.engine.seed);
    let jobs = JobEngine::with_limits(
        Arc::clone(&catalog),
        Arc::clone(&sessions),
        Arc::new(compute),
        config.engine.limits(),
    );
    info!(devices = catalog.len(), limits = ?jobs.limits(), "Job engine ready");

    let sweep = sessions.spawn_expiry_sweep(config.engine.sweep_interval());

    let auth = AuthState::new(
        config.server.api_key.clone(),
        config.server.supported_api_versions.clone(),
    );
    let app = rest_router(AppState::new(jobs, auth), &config.server.cors_origins);

    let addr = config.address()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.shutdown();
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
