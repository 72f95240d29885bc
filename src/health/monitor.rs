//! Peer health monitoring.
//!
//! # Responsibilities
//! - Periodically check every peer's `GET /health`
//! - Update cached peer liveness and raise alerts on transitions

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthMonitorConfig;
use crate::observability::metrics;
use crate::peer::{Peer, PeerClient, PeerRegistry};

pub struct HealthMonitor {
    peers: Arc<PeerRegistry>,
    client: Arc<dyn PeerClient>,
    config: HealthMonitorConfig,
}

impl HealthMonitor {
    pub fn new(peers: Arc<PeerRegistry>, client: Arc<dyn PeerClient>, config: HealthMonitorConfig) -> Self {
        Self {
            peers,
            client,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Peer health monitor disabled");
            return;
        }

        tracing::info!(interval = self.config.interval_secs, "Health monitor starting");

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Check every peer once.
    pub async fn check_all(&self) {
        for peer in self.peers.all() {
            let alive = self.check(peer).await;
            let was_alive = peer.set_alive(alive);

            match (was_alive, alive) {
                (true, false) => tracing::error!(peer = %peer.identity, "ALERT: peer is down"),
                (false, true) => tracing::info!(peer = %peer.identity, "Peer is back up"),
                _ => {}
            }

            metrics::set_peer_alive(&peer.identity, alive);
        }
    }

    async fn check(&self, peer: &Peer) -> bool {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.check_health(&peer.base_url)).await {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                tracing::warn!(peer = %peer.identity, "Health check failed: non-success status");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(peer = %peer.identity, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(peer = %peer.identity, "Health check failed: timeout");
                false
            }
        }
    }
}
