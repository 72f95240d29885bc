//! Recording peer client for unit tests.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::peer::client::{PeerClient, PeerError};

/// A call observed by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchDraw(String),
    NotifyDown { target: String, identity: String },
    Replicate { peer: String, payload: String },
    HealthCheck(String),
    SetAlive { worker: String, alive: bool },
    Dispatch { worker: String, payload: String },
}

/// Records every call; answers draws from a script and fails listed hosts.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    draws: Mutex<VecDeque<Result<u8, PeerError>>>,
    failing: Mutex<HashSet<String>>,
    unhealthy: Mutex<HashSet<String>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue answers for `fetch_draw`. An empty queue means unreachable.
    pub fn with_draws(self, draws: impl IntoIterator<Item = Result<u8, PeerError>>) -> Self {
        self.draws.lock().extend(draws);
        self
    }

    /// Every call to `url` fails with a transport error.
    pub fn fail(&self, url: &Url) {
        self.failing.lock().insert(url.to_string());
    }

    /// Health checks of `url` report a non-success status.
    pub fn mark_unhealthy(&self, url: &Url) {
        self.unhealthy.lock().insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn replications(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Replicate { .. }))
            .count()
    }

    fn record(&self, url: &Url, call: Call) -> Result<(), PeerError> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(url.as_str()) {
            Err(PeerError::Transport(format!("connection refused: {}", url)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PeerClient for RecordingClient {
    async fn fetch_draw(&self, peer: &Url, _attempt: u32) -> Result<u8, PeerError> {
        self.record(peer, Call::FetchDraw(peer.to_string()))?;
        self.draws
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(PeerError::Transport("no scripted draw".into())))
    }

    async fn notify_down(&self, target: &Url, identity: &str) -> Result<(), PeerError> {
        self.record(
            target,
            Call::NotifyDown {
                target: target.to_string(),
                identity: identity.to_string(),
            },
        )
    }

    async fn replicate(&self, peer: &Url, payload: &str) -> Result<(), PeerError> {
        self.record(
            peer,
            Call::Replicate {
                peer: peer.to_string(),
                payload: payload.to_string(),
            },
        )
    }

    async fn check_health(&self, peer: &Url) -> Result<bool, PeerError> {
        self.record(peer, Call::HealthCheck(peer.to_string()))?;
        Ok(!self.unhealthy.lock().contains(peer.as_str()))
    }

    async fn set_alive(&self, worker: &Url, alive: bool) -> Result<(), PeerError> {
        self.record(
            worker,
            Call::SetAlive {
                worker: worker.to_string(),
                alive,
            },
        )
    }

    async fn dispatch(&self, worker: &Url, payload: &str) -> Result<(), PeerError> {
        self.record(
            worker,
            Call::Dispatch {
                worker: worker.to_string(),
                payload: payload.to_string(),
            },
        )
    }
}
