//! reqwest-backed peer client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

use crate::peer::client::{PeerClient, PeerError};

/// Body of `POST /notify-down`.
#[derive(Debug, Serialize)]
struct DownNotice<'a> {
    identity: &'a str,
}

/// Peer client speaking the instance HTTP surface.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    /// Create a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Resolve `path` under `base`, keeping any path prefix of `base`.
fn endpoint(base: &Url, path: &str) -> Result<Url, PeerError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path)
        .map_err(|e| PeerError::Transport(format!("bad endpoint {}{}: {}", base, path, e)))
}

fn transport(err: reqwest::Error) -> PeerError {
    if err.is_timeout() {
        PeerError::Timeout
    } else {
        PeerError::Transport(err.to_string())
    }
}

fn require_success(response: Response) -> Result<Response, PeerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PeerError::Status(status.as_u16()))
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_draw(&self, peer: &Url, attempt: u32) -> Result<u8, PeerError> {
        let response = self
            .client
            .get(endpoint(peer, "peer-draw")?)
            .query(&[("attempt", attempt)])
            .send()
            .await
            .map_err(transport)?;
        require_success(response)?
            .json::<u8>()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))
    }

    async fn notify_down(&self, target: &Url, identity: &str) -> Result<(), PeerError> {
        let response = self
            .client
            .post(endpoint(target, "notify-down")?)
            .json(&DownNotice { identity })
            .send()
            .await
            .map_err(transport)?;
        require_success(response).map(|_| ())
    }

    async fn replicate(&self, peer: &Url, payload: &str) -> Result<(), PeerError> {
        let response = self
            .client
            .post(endpoint(peer, "replica-intake")?)
            .body(payload.to_string())
            .send()
            .await
            .map_err(transport)?;
        require_success(response).map(|_| ())
    }

    async fn check_health(&self, peer: &Url) -> Result<bool, PeerError> {
        let response = self
            .client
            .get(endpoint(peer, "health")?)
            .header("user-agent", "pairwatch-health-check")
            .send()
            .await
            .map_err(transport)?;
        Ok(response.status().is_success())
    }

    async fn set_alive(&self, worker: &Url, alive: bool) -> Result<(), PeerError> {
        let mut url = endpoint(worker, "alive")?;
        url.query_pairs_mut().append_pair("alive", if alive { "true" } else { "false" });
        let response = self.client.post(url).send().await.map_err(transport)?;
        require_success(response).map(|_| ())
    }

    async fn dispatch(&self, worker: &Url, payload: &str) -> Result<(), PeerError> {
        let response = self
            .client
            .post(endpoint(worker, "requests")?)
            .body(payload.to_string())
            .send()
            .await
            .map_err(transport)?;
        require_success(response).map(|_| ())
    }
}
