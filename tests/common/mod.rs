//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pairwatch::arbitration::ScriptedDraws;
use pairwatch::config::{NodeConfig, PeerConfig};
use pairwatch::peer::HttpPeerClient;
use pairwatch::store::MemoryStore;
use pairwatch::{Node, Shutdown};
use sdk_rust::{NodeClient, NodeStatus};
use tokio::net::TcpListener;

/// A running node on a loopback port.
pub struct TestNode {
    pub url: String,
    pub client: NodeClient,
    pub store: Arc<MemoryStore>,
    shutdown: Arc<Shutdown>,
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.shutdown.trigger("test finished");
    }
}

/// Bind an ephemeral loopback port.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// A URL nothing listens on.
pub async fn closed_url() -> String {
    let (listener, url) = bind().await;
    drop(listener);
    url
}

/// Quiet config: no background load, no health checks, 1s restarts.
pub fn config(identity: &str, active_identity: &str) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.identity = identity.into();
    config.active_identity = active_identity.into();
    config.load_generator.enabled = false;
    config.health_monitor.enabled = false;
    config.arbitration.restart_delay_secs = 1;
    config.arbitration.attempt_timeout_ms = 300;
    config
}

pub fn peer(identity: &str, url: &str) -> PeerConfig {
    PeerConfig {
        identity: identity.into(),
        address: url.into(),
    }
}

/// Build and serve a node with scripted draws.
pub fn start(config: NodeConfig, listener: TcpListener, url: String, draws: ScriptedDraws) -> TestNode {
    let store = Arc::new(MemoryStore::new());
    let client = HttpPeerClient::new(Duration::from_secs(2)).unwrap();
    let node = Node::with_parts(config, store.clone(), Arc::new(client), Arc::new(draws)).unwrap();
    let shutdown = node.shutdown_handle();
    tokio::spawn(node.serve(listener));

    TestNode {
        client: NodeClient::new(&url),
        url,
        store,
        shutdown,
    }
}

/// Poll health every 20ms until it equals `expected` or `timeout` passes.
pub async fn wait_for_health(client: &NodeClient, expected: bool, timeout: Duration) -> bool {
    wait_for_status(client, timeout, |_| true, expected).await
}

/// Poll until health equals `healthy` and `check` holds on the status.
pub async fn wait_for_status<F>(client: &NodeClient, timeout: Duration, check: F, healthy: bool) -> bool
where
    F: Fn(&NodeStatus) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let health = client.health().await.unwrap_or(false);
        if health == healthy {
            if let Ok(status) = client.status().await {
                if check(&status) {
                    return true;
                }
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
