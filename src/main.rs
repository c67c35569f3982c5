//! rpaas control plane API (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                  RPAAS CONTROL PLANE                 │
//!                  │                                                      │
//!   API request    │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ───────────────┼─▶│  http   │───▶│ manager  │───▶│     store      │   │
//!                  │  │ server  │    │ (facets) │    │ cached / live  │   │
//!                  │  └─────────┘    └────┬─────┘    └────────────────┘   │
//!                  │                      │                               │
//!                  │                      ▼                               │
//!                  │               ┌──────────────┐                       │
//!                  │               │ nginx purger │────────────────────── ┼──▶ replicas
//!                  │               └──────────────┘                       │
//!                  │                                                      │
//!                  │  config (+ watcher) · observability · resilience ·   │
//!                  │  lifecycle                                           │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rpaas_control::config::loader::load_config;
use rpaas_control::config::watcher::ConfigWatcher;
use rpaas_control::lifecycle::signals::wait_for_termination;
use rpaas_control::nginx::HttpPurger;
use rpaas_control::observability::{logging, metrics};
use rpaas_control::store::{MemoryStore, StoreHandles};
use rpaas_control::{ApiServer, ControlPlaneConfig, Manager, Shutdown};

#[derive(Parser)]
#[command(name = "rpaas-api")]
#[command(about = "Control plane API for managed reverse-proxy instances", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ControlPlaneConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("rpaas-api v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        namespace = %config.rpaas.namespace,
        flavors = config.rpaas.flavors.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = match &config.store.persistence_path {
        Some(path) => MemoryStore::load_from_file(&PathBuf::from(path))?,
        None => MemoryStore::new(None),
    };
    let manager = Manager::from_config(
        StoreHandles::single(Arc::new(store.clone())),
        &config,
        Arc::new(HttpPurger::new(&config.purge)),
    );
    let server = ApiServer::new(manager, config.listener.clone());

    // The watcher must outlive the server.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            server.watch_config(updates);
            match watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to watch config file, hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_termination(shutdown.clone()));

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server.run_tls(addr, tls, shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, shutdown).await?;
        }
    }

    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to persist store");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
