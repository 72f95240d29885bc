//! Instance liveness and role transitions.
//!
//! # State Machine
//! ```text
//! Alive ──mark_down──▶ Down ──restart (deferred)──▶ Alive
//!   │                                                 ▲
//!   └── set_alive(false) ──▶ Down ── set_alive(true) ─┘
//! ```
//!
//! # Design Decisions
//! - Down-notifications are fire-and-forget tasks; failures are logged only
//! - At most one restart is pending at a time
//! - Going down relinquishes the active role; a surviving peer takes it over

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::AbortHandle;
use url::Url;

use crate::admission::state::{InstanceState, SharedState};
use crate::arbitration::CrashArbitrator;
use crate::lifecycle::restart::RestartHandle;
use crate::observability::metrics;
use crate::peer::{PeerClient, PeerRegistry};
use crate::store::{HealthFlag, HealthStore};

/// How an inbound down-notification was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownNotice {
    /// The notification named this instance.
    SelfDown,
    /// A known peer's cached liveness was cleared.
    PeerMarked,
    /// Nobody by that identity; ignored.
    Unknown,
}

pub struct InstanceLifecycle {
    identity: String,
    state: SharedState,
    peers: Arc<PeerRegistry>,
    client: Arc<dyn PeerClient>,
    store: Arc<dyn HealthStore>,
    arbiter: Arc<CrashArbitrator>,
    aggregator: Option<Url>,
    restart_delay: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

impl InstanceLifecycle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: impl Into<String>,
        state: SharedState,
        peers: Arc<PeerRegistry>,
        client: Arc<dyn PeerClient>,
        store: Arc<dyn HealthStore>,
        arbiter: Arc<CrashArbitrator>,
        aggregator: Option<Url>,
        restart_delay: Duration,
    ) -> Self {
        Self {
            identity: identity.into(),
            state,
            peers,
            client,
            store,
            arbiter,
            aggregator,
            restart_delay,
            pending: Mutex::new(None),
        }
    }

    /// Reset liveness and derive the role from the designated active identity.
    pub fn initialize(&self, identity: &str, active_identity: &str) {
        let instance = InstanceState::initial(identity, active_identity);
        self.state.lock().instance = instance;
        tracing::info!(
            identity,
            active_identity,
            active = instance.active,
            "Instance initialized"
        );
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn instance(&self) -> InstanceState {
        self.state.lock().instance
    }

    pub fn restart_delay(&self) -> Duration {
        self.restart_delay
    }

    /// Take this instance down and tell the aggregator and peers.
    ///
    /// Returns `false` if it was already down.
    pub fn mark_down(&self, reason: &str) -> bool {
        let was_alive = {
            let mut state = self.state.lock();
            let was_alive = state.instance.alive;
            state.instance.alive = false;
            state.instance.active = false;
            was_alive
        };

        if !was_alive {
            tracing::debug!(identity = %self.identity, reason, "Already down");
            return false;
        }

        tracing::warn!(identity = %self.identity, reason, "Instance marked down");

        let targets = self
            .aggregator
            .iter()
            .cloned()
            .chain(self.peers.all().iter().map(|p| p.base_url.clone()));
        for target in targets {
            let client = Arc::clone(&self.client);
            let identity = self.identity.clone();
            tokio::spawn(async move {
                if let Err(e) = client.notify_down(&target, &identity).await {
                    tracing::warn!(target = %target, error = %e, "Down-notification failed");
                }
            });
        }
        true
    }

    /// Arm a one-shot restart. `None` if one is already pending.
    pub fn schedule_restart(self: &Arc<Self>, after: Duration) -> Option<RestartHandle> {
        let mut pending = self.pending.lock();
        if pending.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!(identity = %self.identity, "Restart already pending");
            return None;
        }

        let this = Arc::clone(self);
        let handle = RestartHandle::spawn(after, async move { this.restart() });
        *pending = Some(handle.abort_handle());

        tracing::info!(identity = %self.identity, after = ?after, "Restart scheduled");
        Some(handle)
    }

    /// Cancel a pending restart. Returns `true` if one was pending.
    pub fn cancel_restart(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::info!(identity = %self.identity, "Pending restart cancelled");
                true
            }
            _ => false,
        }
    }

    pub fn restart_pending(&self) -> bool {
        self.pending.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Come back up with a clean window and an operational snapshot.
    pub fn restart(&self) {
        {
            let mut state = self.state.lock();
            state.instance.alive = true;
            state.window.reset();
            state.breach_latched = false;
            state.snapshot.flag = Some(HealthFlag::Operational);
            state.snapshot.excess = 0;
            if let Err(e) = self.store.save_health(&state.snapshot) {
                tracing::error!(identity = %self.identity, error = %e, "Failed to persist restart");
            }
        }
        self.arbiter.reset();
        metrics::set_window_excess(0);
        tracing::info!(identity = %self.identity, "Instance restarted");
    }

    /// Apply a down-notification naming `identity`.
    pub fn handle_external_down_notification(self: &Arc<Self>, identity: &str) -> DownNotice {
        if identity == self.identity {
            if self.mark_down("reported down by peer") {
                self.schedule_restart(self.restart_delay);
            }
            return DownNotice::SelfDown;
        }

        let Some(peer) = self.peers.get(identity) else {
            tracing::warn!(identity, "Down-notification for unknown instance ignored");
            return DownNotice::Unknown;
        };

        peer.set_alive(false);
        metrics::set_peer_alive(identity, false);
        tracing::warn!(peer = identity, "Peer reported down");

        let mut state = self.state.lock();
        if state.instance.alive && !state.instance.active {
            state.instance.active = true;
            tracing::info!(identity = %self.identity, from = identity, "Taking over active role");
        }
        DownNotice::PeerMarked
    }

    /// Tell a peer that it lost arbitration and must go down.
    pub fn announce_peer_down(&self, identity: &str) {
        let Some(peer) = self.peers.get(identity) else {
            tracing::warn!(peer = identity, "Cannot announce down: unknown peer");
            return;
        };

        peer.set_alive(false);
        metrics::set_peer_alive(identity, false);

        let peer = Arc::clone(peer);
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            if let Err(e) = client.notify_down(&peer.base_url, &peer.identity).await {
                tracing::warn!(peer = %peer.identity, error = %e, "Failed to notify peer of its loss");
            }
        });
    }

    /// Worker alive switch. Returns the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        let previous = std::mem::replace(&mut self.state.lock().instance.alive, alive);
        if previous != alive {
            tracing::info!(identity = %self.identity, alive, "Alive switch flipped");
        }
        previous
    }
}
