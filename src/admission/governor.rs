//! Per-request orchestration.
//!
//! # Request Flow
//! ```text
//! accept(payload)
//!     → reject if down or crashed
//!     → WindowedCounter::tick, snapshot update            (state lock)
//!     → excess > limit and no breach yet this window?
//!         yes → CrashArbitrator::resolve                  (no lock held)
//!               Winner → commit record, tell peer it lost
//!               Loser  → flag crashed, mark down, schedule restart, reject
//!         no  → commit record                             (state lock)
//!     → ReplicaSync::broadcast
//! ```

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use url::Url;

use crate::admission::state::{CoreState, InstanceState, SharedState};
use crate::arbitration::{CrashArbitrator, DrawSource, Phase, Verdict};
use crate::config::validation::ValidationError;
use crate::config::NodeConfig;
use crate::error::{CoordError, CoordResult};
use crate::lifecycle::instance::{DownNotice, InstanceLifecycle};
use crate::observability::metrics::{self, AdmissionOutcome};
use crate::peer::{PeerClient, PeerRegistry};
use crate::replication::ReplicaSync;
use crate::store::{HealthFlag, HealthSnapshot, HealthStore, RecordId, RequestRecord};

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// The instance is down.
    Down,
    /// The current snapshot is crashed.
    Overloaded,
}

/// Result of offering a request to the governor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted {
        id: RecordId,
        excess: u32,
        /// The window is past its cap but below the crash limit.
        overloaded: bool,
    },
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }
}

/// Snapshot of this instance for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub identity: String,
    pub alive: bool,
    pub active: bool,
    pub excess: u32,
    pub flag: Option<HealthFlag>,
    pub request_count: u64,
    pub phase: Phase,
}

enum Outcome {
    Committed(RequestRecord, u32),
    Rejected(RejectReason),
}

fn rejection(state: &CoreState) -> Option<RejectReason> {
    if !state.instance.alive {
        Some(RejectReason::Down)
    } else if state.snapshot.is_crashed() {
        Some(RejectReason::Overloaded)
    } else {
        None
    }
}

/// Ties the window, arbitration, lifecycle, and replication together.
pub struct RequestGovernor {
    identity: String,
    excess_limit: u32,
    state: SharedState,
    store: Arc<dyn HealthStore>,
    peers: Arc<PeerRegistry>,
    arbiter: Arc<CrashArbitrator>,
    lifecycle: Arc<InstanceLifecycle>,
    replicas: ReplicaSync,
}

impl RequestGovernor {
    /// Wire up every component from configuration.
    ///
    /// The latest stored snapshot is reused and marked operational.
    pub fn from_config(
        config: &NodeConfig,
        store: Arc<dyn HealthStore>,
        client: Arc<dyn PeerClient>,
        draws: Arc<dyn DrawSource>,
    ) -> CoordResult<Self> {
        let cap = NonZeroU32::new(config.window.cap).ok_or_else(|| {
            CoordError::InvalidConfiguration(vec![ValidationError::new("window.cap", "must be at least 1")])
        })?;
        if config.window.excess_limit == 0 {
            return Err(CoordError::InvalidConfiguration(vec![ValidationError::new(
                "window.excess_limit",
                "must be at least 1",
            )]));
        }

        let aggregator = config
            .health_aggregator
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| {
                CoordError::InvalidConfiguration(vec![ValidationError::new("health_aggregator", e.to_string())])
            })?;

        let mut snapshot = store.load_latest_health()?.unwrap_or_default();
        snapshot.flag = Some(HealthFlag::Operational);
        snapshot.excess = 0;
        store.save_health(&snapshot)?;

        let state: SharedState = Arc::new(Mutex::new(CoreState::new(
            cap,
            Duration::from_secs(config.window.duration_secs),
            InstanceState::initial(&config.identity, &config.active_identity),
            snapshot,
        )));
        let peers = Arc::new(PeerRegistry::from_config(&config.peers)?);
        let arbiter = Arc::new(CrashArbitrator::new(
            config.identity.clone(),
            peers.clone(),
            client.clone(),
            draws,
            &config.arbitration,
        ));
        let lifecycle = Arc::new(InstanceLifecycle::new(
            config.identity.clone(),
            state.clone(),
            peers.clone(),
            client.clone(),
            store.clone(),
            arbiter.clone(),
            aggregator,
            Duration::from_secs(config.arbitration.restart_delay_secs),
        ));
        lifecycle.initialize(&config.identity, &config.active_identity);
        let replicas = ReplicaSync::new(state.clone(), store.clone(), peers.clone(), client);

        Ok(Self {
            identity: config.identity.clone(),
            excess_limit: config.window.excess_limit,
            state,
            store,
            peers,
            arbiter,
            lifecycle,
            replicas,
        })
    }

    /// Admit one request.
    pub async fn accept(&self, payload: impl Into<String>) -> CoordResult<Admission> {
        let payload = payload.into();

        let committed = {
            let mut state = self.state.lock();
            if let Some(reason) = rejection(&state) {
                return Ok(self.reject(reason));
            }

            let tick = state.window.tick();
            if tick.rolled_over {
                state.breach_latched = false;
            }
            state.snapshot.excess = tick.excess;
            metrics::set_window_excess(tick.excess);

            if tick.excess > self.excess_limit && !state.breach_latched {
                state.breach_latched = true;
                self.store.save_health(&state.snapshot)?;
                tracing::warn!(
                    identity = %self.identity,
                    excess = tick.excess,
                    limit = self.excess_limit,
                    "Excess limit breached, starting arbitration"
                );
                None
            } else {
                Some((self.commit(&mut state, &payload)?, tick.excess))
            }
        };

        let outcome = match committed {
            Some((record, excess)) => Outcome::Committed(record, excess),
            None => self.arbitrate(&payload).await?,
        };

        match outcome {
            Outcome::Committed(record, excess) => {
                self.replicas.broadcast(&record);
                let overloaded = excess > 0;
                metrics::record_admission(if overloaded {
                    AdmissionOutcome::Overloaded
                } else {
                    AdmissionOutcome::Accepted
                });
                Ok(Admission::Accepted {
                    id: record.id,
                    excess,
                    overloaded,
                })
            }
            Outcome::Rejected(reason) => Ok(self.reject(reason)),
        }
    }

    async fn arbitrate(&self, payload: &str) -> CoordResult<Outcome> {
        let Some(round) = self.arbiter.resolve().await else {
            return self.commit_unlocked(payload);
        };

        match round.verdict {
            Verdict::Winner => {
                let outcome = {
                    let mut state = self.state.lock();
                    state.snapshot.flag = Some(HealthFlag::Operational);
                    match rejection(&state) {
                        Some(reason) => Outcome::Rejected(reason),
                        None => {
                            let excess = state.snapshot.excess;
                            Outcome::Committed(self.commit(&mut state, payload)?, excess)
                        }
                    }
                };
                if let Some(peer) = round.peer_identity.as_deref() {
                    self.lifecycle.announce_peer_down(peer);
                }
                Ok(outcome)
            }
            Verdict::Loser => {
                {
                    let mut state = self.state.lock();
                    state.snapshot.flag = Some(HealthFlag::Crashed);
                    self.store.save_health(&state.snapshot)?;
                }
                self.lifecycle.mark_down("lost crash arbitration");
                self.lifecycle.schedule_restart(self.lifecycle.restart_delay());
                Ok(Outcome::Rejected(RejectReason::Overloaded))
            }
        }
    }

    fn commit_unlocked(&self, payload: &str) -> CoordResult<Outcome> {
        let mut state = self.state.lock();
        if let Some(reason) = rejection(&state) {
            return Ok(Outcome::Rejected(reason));
        }
        let excess = state.snapshot.excess;
        Ok(Outcome::Committed(self.commit(&mut state, payload)?, excess))
    }

    fn commit(&self, state: &mut CoreState, payload: &str) -> CoordResult<RequestRecord> {
        state.snapshot.request_count += 1;
        let record = RequestRecord::new(payload, state.snapshot.id);
        self.store.save_health(&state.snapshot)?;
        self.store.save_record(&record)?;
        Ok(record)
    }

    fn reject(&self, reason: RejectReason) -> Admission {
        metrics::record_admission(match reason {
            RejectReason::Down => AdmissionOutcome::RejectedDown,
            RejectReason::Overloaded => AdmissionOutcome::RejectedOverloaded,
        });
        tracing::debug!(identity = %self.identity, reason = ?reason, "Request rejected");
        Admission::Rejected(reason)
    }

    pub fn status(&self) -> Status {
        let state = self.state.lock();
        Status {
            identity: self.identity.clone(),
            alive: state.instance.alive,
            active: state.instance.active,
            excess: state.snapshot.excess,
            flag: state.snapshot.flag,
            request_count: state.snapshot.request_count,
            phase: self.arbiter.phase(),
        }
    }

    /// Alive and not crashed.
    pub fn is_healthy(&self) -> bool {
        rejection(&self.state.lock()).is_none()
    }

    pub fn instance(&self) -> InstanceState {
        self.state.lock().instance
    }

    pub fn receive_replicated(&self, payload: impl Into<String>) -> CoordResult<Admission> {
        self.replicas.apply_replicated(payload)
    }

    pub fn provide_draw(&self, attempt: u32) -> u8 {
        self.arbiter.provide_draw(attempt)
    }

    pub fn notify_peer_down(&self, identity: &str) -> DownNotice {
        self.lifecycle.handle_external_down_notification(identity)
    }

    pub fn set_alive(&self, alive: bool) -> bool {
        self.lifecycle.set_alive(alive)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn peers(&self) -> &Arc<PeerRegistry> {
        &self.peers
    }

    pub fn arbiter(&self) -> &Arc<CrashArbitrator> {
        &self.arbiter
    }

    pub fn lifecycle(&self) -> &Arc<InstanceLifecycle> {
        &self.lifecycle
    }
}
