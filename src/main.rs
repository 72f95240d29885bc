//! pairwatch: one instance of a cooperating pair.
//!
//! # Architecture Overview
//!
//! ```text
//!        POST /requests                     LoadGenerator (active only)
//!              │                                     │
//!              ▼                                     ▼
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │                      RequestGovernor                        │
//!   │  WindowedCounter ──excess > limit──▶ CrashArbitrator ◀──────┼── GET /peer-draw (peer)
//!   │        │                                   │                │
//!   │        ▼                                   ▼                │
//!   │   HealthStore                      InstanceLifecycle ───────┼── POST /notify-down
//!   │        │                          (mark down, restart)      │
//!   │        ▼                                                    │
//!   │   ReplicaSync ──────────────────────────────────────────────┼── POST /replica-intake
//!   └─────────────────────────────────────────────────────────────┘
//!
//!   POST /loadbalancer ──▶ LoadBalancerCycler ──▶ workers (/alive, /requests)
//!   HealthMonitor ──▶ GET /health on peers
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use pairwatch::config::loader::load_config;
use pairwatch::lifecycle::signals::spawn_signal_handler;
use pairwatch::observability::{logging, metrics};
use pairwatch::{CoordError, Node, NodeConfig};

#[derive(Parser)]
#[command(name = "pairwatch")]
#[command(about = "One instance of a self-arbitrating service pair", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured identity.
    #[arg(short, long)]
    identity: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path).map_err(CoordError::from)?,
        None => NodeConfig::default(),
    };
    if let Some(identity) = cli.identity {
        config.identity = identity;
    }

    logging::init_logging(&config.observability);
    tracing::info!("pairwatch v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let node = match Node::build(config.clone()) {
        Ok(node) => node,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        identity = %config.identity,
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    spawn_signal_handler(node.shutdown_handle());
    node.serve(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
