//! Crash arbitration between the two instances of a pair.
//!
//! # State Machine
//! ```text
//! Normal → AwaitingPeerDraw → { Winner | Loser }
//! Winner/Loser → AwaitingPeerDraw   (next breach)
//! Winner/Loser → Normal             (restart)
//! ```
//!
//! # Protocol
//! - Each attempt of a round has one committed draw in [1,5]. The local round
//!   and `GET /peer-draw?attempt=n` read the same ledger entry, drawn on
//!   first use, so both sides compare the same pair of values
//! - Query the peer's draw for the same attempt (bounded retries)
//! - Strictly lower draw wins; equal draws are redrawn up to `max_redraws`
//!   times, then the lexicographically lower identity wins
//! - An unreachable peer counts as drawing `UNREACHABLE_DRAW`, so the local
//!   instance wins
//! - At most one round runs at a time; overlapping calls return `None`

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::arbitration::contest::{highest, Yielding};
use crate::arbitration::draw::{DrawSource, DRAW_MAX, DRAW_MIN};
use crate::config::ArbitrationConfig;
use crate::observability::metrics;
use crate::peer::{Peer, PeerClient, PeerRegistry};
use crate::resilience::retries::{retry, RetryPolicy};

/// Draw assumed for a peer that never answered.
pub const UNREACHABLE_DRAW: u8 = DRAW_MAX + 1;

/// Outcome of a round for the local instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Winner,
    Loser,
}

/// Arbitrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Normal,
    AwaitingPeerDraw,
    Winner,
    Loser,
}

impl From<Verdict> for Phase {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Winner => Phase::Winner,
            Verdict::Loser => Phase::Loser,
        }
    }
}

/// The peer's side of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerDraw {
    Drawn(u8),
    Unreachable,
}

impl PeerDraw {
    pub fn value(self) -> u8 {
        match self {
            PeerDraw::Drawn(v) => v,
            PeerDraw::Unreachable => UNREACHABLE_DRAW,
        }
    }
}

/// A completed arbitration round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub local: u8,
    pub peer: PeerDraw,
    /// Identity of the counterpart, if one is configured.
    pub peer_identity: Option<String>,
    /// Equal-draw repetitions before the decision.
    pub redraws: u32,
    pub verdict: Verdict,
}

/// Draws committed for the current exchange, indexed by attempt.
///
/// A concluded ledger is replaced when the next local round starts, unless a
/// peer read from it since; a read reopens it.
#[derive(Debug, Default)]
struct DrawLedger {
    draws: Vec<u8>,
    concluded: bool,
}

/// Decides which instance of the pair goes down on an excess breach.
pub struct CrashArbitrator {
    identity: String,
    peers: Arc<PeerRegistry>,
    client: Arc<dyn PeerClient>,
    draws: Arc<dyn DrawSource>,
    policy: RetryPolicy,
    max_redraws: u32,
    phase: Mutex<Phase>,
    ledger: Mutex<DrawLedger>,
    round_lock: tokio::sync::Mutex<()>,
    last_provided: AtomicU8,
    rounds: AtomicU64,
}

impl CrashArbitrator {
    pub fn new(
        identity: impl Into<String>,
        peers: Arc<PeerRegistry>,
        client: Arc<dyn PeerClient>,
        draws: Arc<dyn DrawSource>,
        config: &ArbitrationConfig,
    ) -> Self {
        Self {
            identity: identity.into(),
            peers,
            client,
            draws,
            policy: RetryPolicy::from(config),
            max_redraws: config.max_redraws,
            phase: Mutex::new(Phase::Normal),
            ledger: Mutex::new(DrawLedger::default()),
            round_lock: tokio::sync::Mutex::new(()),
            last_provided: AtomicU8::new(0),
            rounds: AtomicU64::new(0),
        }
    }

    /// Run one arbitration round, or `None` if a round is already running.
    pub async fn resolve(&self) -> Option<Round> {
        let Ok(_guard) = self.round_lock.try_lock() else {
            tracing::debug!("Arbitration round already in progress, skipping");
            return None;
        };

        self.rounds.fetch_add(1, Ordering::Relaxed);
        *self.phase.lock() = Phase::AwaitingPeerDraw;
        {
            let mut ledger = self.ledger.lock();
            if ledger.concluded {
                *ledger = DrawLedger::default();
            }
        }

        let peer = self.peers.primary().cloned();
        let mut redraws = 0;

        let round = loop {
            let local = self.committed_draw(redraws);
            let peer_draw = match &peer {
                Some(p) => self.fetch_peer_draw(p, redraws).await,
                None => PeerDraw::Unreachable,
            };

            tracing::info!(
                identity = %self.identity,
                local_draw = local,
                peer_draw = ?peer_draw,
                "Arbitration draws exchanged"
            );

            let verdict = match highest(&[local, peer_draw.value()]) {
                Some(Yielding::Single(0)) => Some(Verdict::Loser),
                Some(Yielding::Single(_)) => Some(Verdict::Winner),
                _ => None,
            };

            let verdict = match verdict {
                Some(v) => v,
                None if redraws < self.max_redraws => {
                    redraws += 1;
                    tracing::info!(draw = local, redraws, "Equal draws, redrawing");
                    continue;
                }
                None => self.identity_order(peer.as_deref()),
            };

            break Round {
                local,
                peer: peer_draw,
                peer_identity: peer.as_ref().map(|p| p.identity.clone()),
                redraws,
                verdict,
            };
        };

        self.ledger.lock().concluded = true;
        *self.phase.lock() = round.verdict.into();
        metrics::record_arbitration(round.verdict);
        tracing::info!(
            identity = %self.identity,
            verdict = ?round.verdict,
            redraws = round.redraws,
            "Arbitration decided"
        );
        Some(round)
    }

    async fn fetch_peer_draw(&self, peer: &Peer, attempt: u32) -> PeerDraw {
        let client = &self.client;
        let url = &peer.base_url;
        match retry(&self.policy, "peer-draw", |_| client.fetch_draw(url, attempt)).await {
            Ok(v) if (DRAW_MIN..=DRAW_MAX).contains(&v) => PeerDraw::Drawn(v),
            Ok(v) => {
                tracing::warn!(peer = %peer.identity, draw = v, "Peer draw out of range, treating as unreachable");
                PeerDraw::Unreachable
            }
            Err(e) => {
                tracing::warn!(peer = %peer.identity, error = %e, "Peer unreachable during arbitration");
                PeerDraw::Unreachable
            }
        }
    }

    /// Deterministic fallback once redraws run out: lower identity wins.
    fn identity_order(&self, peer: Option<&Peer>) -> Verdict {
        let verdict = match peer {
            Some(p) if p.identity.as_str() < self.identity.as_str() => Verdict::Loser,
            _ => Verdict::Winner,
        };
        tracing::warn!(
            identity = %self.identity,
            verdict = ?verdict,
            "Draws stayed equal, deciding by identity order"
        );
        verdict
    }

    /// The ledger entry for `attempt`, drawing any missing entries up to it.
    fn committed_draw(&self, attempt: u32) -> u8 {
        let mut ledger = self.ledger.lock();
        self.fill(&mut ledger, attempt)
    }

    fn fill(&self, ledger: &mut DrawLedger, attempt: u32) -> u8 {
        let index = attempt as usize;
        while ledger.draws.len() <= index {
            ledger.draws.push(self.draws.draw());
        }
        ledger.draws[index]
    }

    /// Answer a peer's draw query for `attempt` with the committed draw.
    ///
    /// `attempt` is clamped to the redraw limit.
    pub fn provide_draw(&self, attempt: u32) -> u8 {
        let attempt = attempt.min(self.max_redraws);
        let draw = {
            let mut ledger = self.ledger.lock();
            ledger.concluded = false;
            self.fill(&mut ledger, attempt)
        };
        self.last_provided.store(draw, Ordering::Relaxed);
        tracing::debug!(draw, attempt, "Provided draw to peer");
        draw
    }

    /// Last value handed out by [`provide_draw`](Self::provide_draw); 0 if none.
    pub fn last_provided(&self) -> u8 {
        self.last_provided.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Return to `Normal` after a restart.
    pub fn reset(&self) {
        *self.phase.lock() = Phase::Normal;
        *self.ledger.lock() = DrawLedger::default();
    }

    /// Rounds started since creation.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::draw::ScriptedDraws;
    use crate::config::PeerConfig;
    use crate::peer::mock::{Call, RecordingClient};
    use crate::peer::PeerError;

    fn registry(peer_identity: &str) -> Arc<PeerRegistry> {
        Arc::new(
            PeerRegistry::from_config(&[PeerConfig {
                identity: peer_identity.into(),
                address: "http://127.0.0.1:8081".into(),
            }])
            .unwrap(),
        )
    }

    fn arbiter(
        identity: &str,
        peers: Arc<PeerRegistry>,
        client: Arc<RecordingClient>,
        local_draws: impl IntoIterator<Item = u8>,
    ) -> CrashArbitrator {
        CrashArbitrator::new(
            identity,
            peers,
            client,
            Arc::new(ScriptedDraws::new(local_draws)),
            &ArbitrationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_lower_draw_wins() {
        let client = Arc::new(RecordingClient::new().with_draws([Ok(4)]));
        let arb = arbiter("instance-1", registry("instance-2"), client, [2]);

        let round = arb.resolve().await.unwrap();
        assert_eq!(round.verdict, Verdict::Winner);
        assert_eq!(round.peer, PeerDraw::Drawn(4));
        assert_eq!(round.peer_identity.as_deref(), Some("instance-2"));
        assert_eq!(arb.phase(), Phase::Winner);
    }

    #[tokio::test]
    async fn test_higher_draw_loses() {
        let client = Arc::new(RecordingClient::new().with_draws([Ok(2)]));
        let arb = arbiter("instance-1", registry("instance-2"), client, [4]);

        let round = arb.resolve().await.unwrap();
        assert_eq!(round.verdict, Verdict::Loser);
        assert_eq!(arb.phase(), Phase::Loser);
    }

    #[tokio::test]
    async fn test_equal_draws_are_redrawn() {
        let client = Arc::new(RecordingClient::new().with_draws([Ok(3), Ok(3), Ok(1)]));
        let arb = arbiter("instance-1", registry("instance-2"), client.clone(), [3, 3, 2]);

        let round = arb.resolve().await.unwrap();
        assert_eq!(round.redraws, 2);
        assert_eq!(round.local, 2);
        assert_eq!(round.peer, PeerDraw::Drawn(1));
        assert_eq!(round.verdict, Verdict::Loser);

        let fetches = client
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::FetchDraw(_)))
            .count();
        assert_eq!(fetches, 3);
    }

    #[tokio::test]
    async fn test_persistent_tie_falls_back_to_identity_order() {
        let config = ArbitrationConfig {
            max_redraws: 1,
            ..ArbitrationConfig::default()
        };

        let client = Arc::new(RecordingClient::new().with_draws([Ok(3), Ok(3)]));
        let arb = CrashArbitrator::new(
            "instance-2",
            registry("instance-1"),
            client,
            Arc::new(ScriptedDraws::new([3, 3])),
            &config,
        );
        assert_eq!(arb.resolve().await.unwrap().verdict, Verdict::Loser);

        let client = Arc::new(RecordingClient::new().with_draws([Ok(3), Ok(3)]));
        let arb = CrashArbitrator::new(
            "instance-1",
            registry("instance-2"),
            client,
            Arc::new(ScriptedDraws::new([3, 3])),
            &config,
        );
        assert_eq!(arb.resolve().await.unwrap().verdict, Verdict::Winner);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_peer_means_local_wins() {
        let client = Arc::new(RecordingClient::new().with_draws([
            Err(PeerError::Timeout),
            Err(PeerError::Status(503)),
            Err(PeerError::Transport("refused".into())),
        ]));
        let arb = arbiter("instance-1", registry("instance-2"), client.clone(), [5]);

        let round = arb.resolve().await.unwrap();
        assert_eq!(round.peer, PeerDraw::Unreachable);
        assert_eq!(round.verdict, Verdict::Winner);
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_no_peer_configured_wins_without_calls() {
        let client = Arc::new(RecordingClient::new());
        let arb = arbiter("solo", Arc::new(PeerRegistry::default()), client.clone(), [5]);

        let round = arb.resolve().await.unwrap();
        assert_eq!(round.verdict, Verdict::Winner);
        assert!(round.peer_identity.is_none());
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_rounds_are_skipped() {
        // No scripted peer draws: every fetch fails and the round backs off,
        // keeping the first round in flight while the second one starts.
        let client = Arc::new(RecordingClient::new());
        let arb = arbiter("instance-1", registry("instance-2"), client, [1, 1]);

        let (first, second) = tokio::join!(arb.resolve(), arb.resolve());
        assert_eq!(first.is_some() as u8 + second.is_some() as u8, 1);
        assert_eq!(arb.rounds(), 1);
    }

    #[test]
    fn test_provide_draw_remembers_value() {
        let client = Arc::new(RecordingClient::new());
        let arb = arbiter("instance-1", registry("instance-2"), client, [4, 2]);
        assert_eq!(arb.last_provided(), 0);
        assert_eq!(arb.provide_draw(0), 4);
        assert_eq!(arb.provide_draw(0), 4);
        assert_eq!(arb.provide_draw(1), 2);
        assert_eq!(arb.last_provided(), 2);
    }

    #[tokio::test]
    async fn test_round_uses_draw_already_given_to_peer() {
        let client = Arc::new(RecordingClient::new().with_draws([Ok(3)]));
        let arb = arbiter("instance-1", registry("instance-2"), client, [1, 5]);

        assert_eq!(arb.provide_draw(0), 1);
        let round = arb.resolve().await.unwrap();
        assert_eq!(round.local, 1);
        assert_eq!(round.verdict, Verdict::Winner);

        // The peer reads the same value after this side concluded.
        assert_eq!(arb.provide_draw(0), 1);
    }

    #[tokio::test]
    async fn test_concluded_ledger_is_replaced_by_next_round() {
        let client = Arc::new(RecordingClient::new().with_draws([Ok(3), Ok(3)]));
        let arb = arbiter("instance-1", registry("instance-2"), client, [1, 5]);

        assert_eq!(arb.resolve().await.unwrap().local, 1);
        let second = arb.resolve().await.unwrap();
        assert_eq!(second.local, 5);
        assert_eq!(second.verdict, Verdict::Loser);
    }

    #[tokio::test]
    async fn test_reset_clears_ledger() {
        let client = Arc::new(RecordingClient::new());
        let arb = arbiter("instance-1", registry("instance-2"), client, [2, 4]);
        assert_eq!(arb.provide_draw(0), 2);
        arb.reset();
        assert_eq!(arb.provide_draw(0), 4);
    }

    #[test]
    fn test_provide_draw_clamps_attempt_to_redraw_limit() {
        let client = Arc::new(RecordingClient::new());
        let arb = arbiter("instance-1", registry("instance-2"), client, 1..=5);
        let last = arb.provide_draw(u32::MAX);
        assert_eq!(arb.provide_draw(8), last);
        assert_eq!(arb.provide_draw(7), arb.provide_draw(7));
    }
}
