//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and build every subsystem in dependency order
//! - Start background tasks (load generator, peer health monitor)
//! - Serve HTTP until shutdown
//!
//! # Design Decisions
//! - Fail fast: invalid configuration is fatal
//! - Background tasks subscribe to the shared shutdown signal

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::admission::RequestGovernor;
use crate::arbitration::{DrawSource, RandomDraws};
use crate::config::validation::validate_config;
use crate::config::NodeConfig;
use crate::error::{CoordError, CoordResult};
use crate::health::HealthMonitor;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::load_balancer::{LoadBalancerCycler, WorkerPool};
use crate::loadgen::LoadGenerator;
use crate::peer::{HttpPeerClient, PeerClient};
use crate::store::{FileStore, HealthStore, MemoryStore};

/// A fully wired instance.
pub struct Node {
    config: NodeConfig,
    governor: Arc<RequestGovernor>,
    cycler: Option<Arc<LoadBalancerCycler>>,
    client: Arc<dyn PeerClient>,
    shutdown: Arc<Shutdown>,
}

impl Node {
    /// Build with HTTP peers, random draws, and the configured store.
    pub fn build(config: NodeConfig) -> CoordResult<Self> {
        validate_config(&config).map_err(CoordError::InvalidConfiguration)?;

        let store: Arc<dyn HealthStore> = match &config.store.path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let client = HttpPeerClient::new(Duration::from_millis(config.balancer.request_timeout_ms))
            .map_err(|e| CoordError::PeerUnreachable {
                peer: config.identity.clone(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Self::with_parts(config, store, Arc::new(client), Arc::new(RandomDraws))
    }

    /// Build from explicit collaborators.
    pub fn with_parts(
        config: NodeConfig,
        store: Arc<dyn HealthStore>,
        client: Arc<dyn PeerClient>,
        draws: Arc<dyn DrawSource>,
    ) -> CoordResult<Self> {
        let governor = Arc::new(RequestGovernor::from_config(
            &config,
            store,
            client.clone(),
            draws.clone(),
        )?);

        let cycler = if config.balancer.enabled {
            let pool = Arc::new(WorkerPool::from_config(&config.balancer.workers)?);
            Some(Arc::new(LoadBalancerCycler::new(
                pool,
                client.clone(),
                draws,
                &config.balancer,
            )))
        } else {
            None
        };

        tracing::info!(
            identity = %config.identity,
            active_identity = %config.active_identity,
            peers = config.peers.len(),
            cap = config.window.cap,
            excess_limit = config.window.excess_limit,
            balancer = config.balancer.enabled,
            "Node built"
        );

        Ok(Self {
            config,
            governor,
            cycler,
            client,
            shutdown: Arc::new(Shutdown::new()),
        })
    }

    pub fn governor(&self) -> &Arc<RequestGovernor> {
        &self.governor
    }

    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        self.shutdown.clone()
    }

    /// Start background tasks and serve until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<(), std::io::Error> {
        if self.config.load_generator.enabled {
            let generator = LoadGenerator::new(self.governor.clone(), &self.config.load_generator);
            tokio::spawn(generator.run(self.shutdown.subscribe()));
        }

        if self.config.health_monitor.enabled && !self.config.peers.is_empty() {
            let monitor = HealthMonitor::new(
                self.governor.peers().clone(),
                self.client.clone(),
                self.config.health_monitor.clone(),
            );
            tokio::spawn(monitor.run(self.shutdown.subscribe()));
        }

        let state = AppState {
            governor: self.governor.clone(),
            cycler: self.cycler.clone(),
            admin: self.config.admin.clone(),
            payload_len: self.config.load_generator.payload_len,
        };

        HttpServer::new(&self.config, state)
            .run(listener, self.shutdown.subscribe())
            .await
    }
}
