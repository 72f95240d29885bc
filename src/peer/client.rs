//! Peer interface consumed by the core.

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::error::Elapsed;
use url::Url;

/// Errors from a single peer or worker call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<Elapsed> for PeerError {
    fn from(_: Elapsed) -> Self {
        PeerError::Timeout
    }
}

/// HTTP-like calls to a cooperating instance.
///
/// Workers behind the load-balancer cycler are instances too, so the same
/// client drives both granularities.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// `GET /peer-draw?attempt=`: the peer's committed draw for `attempt`.
    async fn fetch_draw(&self, peer: &Url, attempt: u32) -> Result<u8, PeerError>;

    /// `POST /notify-down` naming `identity` as down.
    async fn notify_down(&self, target: &Url, identity: &str) -> Result<(), PeerError>;

    /// `POST /replica-intake`.
    async fn replicate(&self, peer: &Url, payload: &str) -> Result<(), PeerError>;

    /// `GET /health`; `Ok(false)` on a non-success status.
    async fn check_health(&self, peer: &Url) -> Result<bool, PeerError>;

    /// `POST /alive?alive=`.
    async fn set_alive(&self, worker: &Url, alive: bool) -> Result<(), PeerError>;

    /// `POST /requests`.
    async fn dispatch(&self, worker: &Url, payload: &str) -> Result<(), PeerError>;
}
