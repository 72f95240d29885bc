//! Replica broadcast and intake.
//!
//! # Responsibilities
//! - Push every locally accepted record to each peer's replica intake
//! - Persist inbound replicated records through the local store
//!
//! # Design Decisions
//! - A replicated write is terminal: intake never broadcasts
//! - Broadcast is one detached task per peer; the caller never waits
//! - Only payload data travels; window and flag state stay local

use std::sync::Arc;

use crate::admission::state::SharedState;
use crate::admission::{Admission, RejectReason};
use crate::error::CoordResult;
use crate::observability::metrics::{self, AdmissionOutcome};
use crate::peer::{PeerClient, PeerRegistry};
use crate::store::{HealthStore, RequestRecord};

pub struct ReplicaSync {
    state: SharedState,
    store: Arc<dyn HealthStore>,
    peers: Arc<PeerRegistry>,
    client: Arc<dyn PeerClient>,
}

impl ReplicaSync {
    pub fn new(
        state: SharedState,
        store: Arc<dyn HealthStore>,
        peers: Arc<PeerRegistry>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        Self {
            state,
            store,
            peers,
            client,
        }
    }

    /// Send `record` to every peer without waiting for the outcome.
    pub fn broadcast(&self, record: &RequestRecord) {
        for peer in self.peers.all() {
            let peer = Arc::clone(peer);
            let client = Arc::clone(&self.client);
            let payload = record.payload.clone();
            let id = record.id;
            tokio::spawn(async move {
                match client.replicate(&peer.base_url, &payload).await {
                    Ok(()) => {
                        metrics::record_replication("outbound", true);
                        tracing::debug!(peer = %peer.identity, record = %id, "Record replicated");
                    }
                    Err(e) => {
                        metrics::record_replication("outbound", false);
                        tracing::warn!(peer = %peer.identity, record = %id, error = %e, "Replication failed");
                    }
                }
            });
        }
    }

    /// Store a record received from a peer.
    ///
    /// Rejected while this instance is down or crashed; never ticks the
    /// window and never broadcasts.
    pub fn apply_replicated(&self, payload: impl Into<String>) -> CoordResult<Admission> {
        let (record, excess) = {
            let state = self.state.lock();
            if !state.instance.alive {
                metrics::record_replication("inbound", false);
                return Ok(Admission::Rejected(RejectReason::Down));
            }
            if state.snapshot.is_crashed() {
                metrics::record_replication("inbound", false);
                return Ok(Admission::Rejected(RejectReason::Overloaded));
            }

            let record = RequestRecord::new(payload, state.snapshot.id);
            self.store.save_record(&record)?;
            (record, state.window.excess())
        };

        metrics::record_replication("inbound", true);
        metrics::record_admission(AdmissionOutcome::Replicated);
        tracing::debug!(record = %record.id, "Replicated record stored");

        Ok(Admission::Accepted {
            id: record.id,
            excess,
            overloaded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::state::{CoreState, InstanceState};
    use crate::config::PeerConfig;
    use crate::peer::mock::{Call, RecordingClient};
    use crate::store::{HealthFlag, HealthSnapshot, MemoryStore};
    use parking_lot::Mutex;
    use std::num::NonZeroU32;
    use std::time::Duration;
    use url::Url;

    struct Fixture {
        sync: ReplicaSync,
        state: SharedState,
        store: Arc<MemoryStore>,
        client: Arc<RecordingClient>,
    }

    fn fixture() -> Fixture {
        let peers = Arc::new(
            PeerRegistry::from_config(&[
                PeerConfig {
                    identity: "instance-2".into(),
                    address: "http://127.0.0.1:8081".into(),
                },
                PeerConfig {
                    identity: "instance-3".into(),
                    address: "http://127.0.0.1:8082".into(),
                },
            ])
            .unwrap(),
        );
        let state: SharedState = Arc::new(Mutex::new(CoreState::new(
            NonZeroU32::new(20).unwrap(),
            Duration::from_secs(60),
            InstanceState::initial("instance-1", "instance-1"),
            HealthSnapshot::new(),
        )));
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(RecordingClient::new());
        let sync = ReplicaSync::new(state.clone(), store.clone(), peers, client.clone());
        Fixture {
            sync,
            state,
            store,
            client,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_applied_replica_is_never_rebroadcast() {
        let f = fixture();
        let admission = f.sync.apply_replicated("abcdefghij").unwrap();
        assert!(matches!(admission, Admission::Accepted { .. }));

        settle().await;
        assert_eq!(f.client.replications(), 0);
        assert_eq!(f.store.records()[0].payload, "abcdefghij");
        assert_eq!(f.state.lock().window.count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_peer() {
        let f = fixture();
        let record = RequestRecord::new("payload", f.state.lock().snapshot.id);
        f.sync.broadcast(&record);

        settle().await;
        let calls = f.client.calls();
        assert_eq!(f.client.replications(), 2);
        assert!(calls.contains(&Call::Replicate {
            peer: "http://127.0.0.1:8082/".into(),
            payload: "payload".into(),
        }));
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_isolated() {
        let f = fixture();
        f.client.fail(&Url::parse("http://127.0.0.1:8081").unwrap());
        let record = RequestRecord::new("payload", f.state.lock().snapshot.id);
        f.sync.broadcast(&record);

        settle().await;
        assert_eq!(f.client.replications(), 2);
    }

    #[tokio::test]
    async fn test_intake_rejected_while_down_or_crashed() {
        let f = fixture();
        f.state.lock().instance.alive = false;
        assert_eq!(
            f.sync.apply_replicated("x").unwrap(),
            Admission::Rejected(RejectReason::Down)
        );

        {
            let mut state = f.state.lock();
            state.instance.alive = true;
            state.snapshot.flag = Some(HealthFlag::Crashed);
        }
        assert_eq!(
            f.sync.apply_replicated("x").unwrap(),
            Admission::Rejected(RejectReason::Overloaded)
        );
        assert_eq!(f.store.record_count(), 0);
    }
}
