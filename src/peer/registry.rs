//! Known peers and their cached liveness.
//!
//! # Responsibilities
//! - Represent each cooperating instance (identity + base URL)
//! - Cache liveness as last reported by health checks or down-notifications
//!
//! # Design Decisions
//! - Liveness is an atomic flag; readers never block writers
//! - Unknown peers start out alive

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use url::Url;

use crate::config::PeerConfig;
use crate::config::validation::ValidationError;
use crate::error::{CoordError, CoordResult};

/// A single cooperating instance.
#[derive(Debug)]
pub struct Peer {
    pub identity: String,
    pub base_url: Url,
    alive: AtomicBool,
}

impl Peer {
    pub fn new(identity: impl Into<String>, base_url: Url) -> Self {
        Self {
            identity: identity.into(),
            base_url,
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Update cached liveness, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::Relaxed)
    }
}

/// All peers of this instance.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Vec<Arc<Peer>>,
}

impl PeerRegistry {
    pub fn new(peers: Vec<Arc<Peer>>) -> Self {
        Self { peers }
    }

    /// Build from configuration.
    pub fn from_config(configs: &[PeerConfig]) -> CoordResult<Self> {
        let mut peers = Vec::with_capacity(configs.len());
        let mut errors = Vec::new();
        for (i, config) in configs.iter().enumerate() {
            match Url::parse(&config.address) {
                Ok(url) => peers.push(Arc::new(Peer::new(config.identity.clone(), url))),
                Err(e) => errors.push(ValidationError::new(
                    format!("peers[{}].address", i),
                    e.to_string(),
                )),
            }
        }
        if !errors.is_empty() {
            return Err(CoordError::InvalidConfiguration(errors));
        }
        Ok(Self { peers })
    }

    /// The arbitration counterpart: the first configured peer.
    pub fn primary(&self) -> Option<&Arc<Peer>> {
        self.peers.first()
    }

    pub fn get(&self, identity: &str) -> Option<&Arc<Peer>> {
        self.peers.iter().find(|p| p.identity == identity)
    }

    pub fn all(&self) -> &[Arc<Peer>] {
        &self.peers
    }
}
