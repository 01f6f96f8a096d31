//! tracker-resilience
//!
//! Resilience and caching core for a fitness-tracking backend: circuit
//! breakers around every external dependency, a TTL cache that degrades to
//! misses when its store fails, and aggregated health reporting.
//!
//! # Architecture Overview
//!
//! ```text
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                     TRACKER RESILIENCE                        │
//!     │                                                               │
//!     │  ┌──────────┐   ┌──────────────────┐   ┌──────────────────┐  │
//!     │  │  http    │──▶│ health aggregator │──▶│ dependency       │──┼──▶ primary store
//!     │  │  admin   │   └──────────────────┘   │ adapters         │  │
//!     │  └──────────┘   ┌──────────────────┐   │ (circuit breaker │  │
//!     │        │        │  cache service    │──▶│  per dependency) │──┼──▶ cache store
//!     │        └───────▶└──────────────────┘   └──────────────────┘  │
//!     │                                                               │
//!     │  config (+ watcher) · lifecycle · observability               │
//!     └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use tracker_resilience::config::{load_config, AppConfig, ConfigWatcher};
use tracker_resilience::http::HttpServer;
use tracker_resilience::lifecycle::{build_context, wait_for_shutdown_signal, Shutdown};
use tracker_resilience::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "tracker-resilience", version, about = "Resilience and caching core")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tracker-resilience starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        admin_enabled = config.admin.enabled,
        health_interval_secs = config.health.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = Arc::new(build_context(config.clone())?);
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    if config.health.enabled {
        let health = context.health.clone();
        tasks.push(tokio::spawn(
            health.run(Duration::from_secs(config.health.interval_secs), shutdown.subscribe()),
        ));
    }

    tasks.push(tokio::spawn(context.cache_backend.clone().run_sweeper(
        Duration::from_secs(config.cache.sweep_interval_secs),
        shutdown.subscribe(),
    )));

    // Watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::error!(error = %e, "Config watcher failed to start, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(context);
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));

    wait_for_shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
