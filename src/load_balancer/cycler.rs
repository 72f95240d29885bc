//! Worker start/stop cycle driven by request count.
//!
//! # Cycle
//! ```text
//! position = ((n - 1) mod (window_size + threshold)) + 1
//!
//! position == 1               → switch every down worker back on
//! position == window_size + 1 → switch off the worker with the highest draw
//! every request               → fan out to all workers that are up
//! ```
//!
//! # Design Decisions
//! - Shutdown candidates are the workers currently up
//! - A worker's local state changes only once its `/alive` call succeeds
//! - Ties on the highest draw are broken by a uniform pick among the tied
//! - Fan-out failures are per worker; one failing worker never blocks others

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use crate::arbitration::{highest, DrawSource, Yielding};
use crate::config::BalancerConfig;
use crate::load_balancer::pool::WorkerPool;
use crate::load_balancer::worker::{Worker, WorkerState};
use crate::observability::metrics;
use crate::peer::PeerClient;

/// What the cycle did before dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CycleAction {
    /// Mid-cycle; no switch changes.
    Steady,
    /// Cycle start; lists the workers switched back on.
    StartedAll { started: Vec<String> },
    /// A worker was switched off.
    ShutDown { worker: String, draws: Vec<u8> },
    /// The chosen worker did not accept the switch-off and stays up.
    ShutdownFailed { worker: String, draws: Vec<u8> },
    /// Shutdown position reached with no worker up.
    NoCandidate,
}

/// Outcome of one cycler request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub position: u64,
    #[serde(flatten)]
    pub action: CycleAction,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct LoadBalancerCycler {
    pool: Arc<WorkerPool>,
    client: Arc<dyn PeerClient>,
    draws: Arc<dyn DrawSource>,
    window_size: u64,
    cycle_len: u64,
    total: AtomicU64,
}

impl LoadBalancerCycler {
    pub fn new(
        pool: Arc<WorkerPool>,
        client: Arc<dyn PeerClient>,
        draws: Arc<dyn DrawSource>,
        config: &BalancerConfig,
    ) -> Self {
        let window_size = u64::from(config.window_size.max(1));
        let threshold = u64::from(config.threshold.max(1));
        Self {
            pool,
            client,
            draws,
            window_size,
            cycle_len: window_size + threshold,
            total: AtomicU64::new(0),
        }
    }

    /// Position in the cycle of the `n`th request, in `1..=cycle_len`.
    pub fn position(&self, n: u64) -> u64 {
        (n.saturating_sub(1) % self.cycle_len) + 1
    }

    /// Advance the cycle by one request and fan `payload` out.
    pub async fn handle_request(&self, payload: &str) -> CycleReport {
        let n = self.total.fetch_add(1, Ordering::Relaxed) + 1;
        let position = self.position(n);

        let action = if position == 1 {
            self.start_all().await
        } else if position == self.window_size + 1 {
            self.shutdown_one().await
        } else {
            CycleAction::Steady
        };

        let (dispatched, failed) = self.dispatch(payload).await;
        CycleReport {
            position,
            action,
            dispatched,
            failed,
        }
    }

    /// Switch every down worker back on.
    pub async fn start_all(&self) -> CycleAction {
        let down = self.pool.down();
        let client = &self.client;
        let started: Vec<String> = join_all(down.iter().map(|worker| async move {
            match client.set_alive(&worker.base_url, true).await {
                Ok(()) => {
                    worker.set_state(WorkerState::Up);
                    metrics::set_worker_up(&worker.name, true);
                    Some(worker.name.clone())
                }
                Err(e) => {
                    tracing::warn!(worker = %worker.name, error = %e, "Failed to switch worker on");
                    None
                }
            }
        }))
        .await
        .into_iter()
        .flatten()
        .collect();

        if !started.is_empty() {
            tracing::info!(workers = ?started, "Cycle start, workers switched on");
        }
        CycleAction::StartedAll { started }
    }

    /// Switch off the up worker holding the highest draw.
    pub async fn shutdown_one(&self) -> CycleAction {
        let candidates = self.pool.up();
        let draws: Vec<u8> = candidates.iter().map(|_| self.draws.draw()).collect();

        let index = match highest(&draws) {
            None => {
                tracing::warn!("Shutdown position reached with no worker up");
                return CycleAction::NoCandidate;
            }
            Some(Yielding::Single(i)) => i,
            Some(Yielding::Tied(tied)) => tied[self.draws.pick(tied.len())],
        };

        let worker: &Arc<Worker> = &candidates[index];
        if let Err(e) = self.client.set_alive(&worker.base_url, false).await {
            tracing::warn!(worker = %worker.name, error = %e, "Failed to switch worker off");
            return CycleAction::ShutdownFailed {
                worker: worker.name.clone(),
                draws,
            };
        }
        worker.set_state(WorkerState::Down);
        metrics::set_worker_up(&worker.name, false);
        tracing::info!(worker = %worker.name, draws = ?draws, "Worker switched off");

        CycleAction::ShutDown {
            worker: worker.name.clone(),
            draws,
        }
    }

    /// Send `payload` to every up worker; returns (ok, failed).
    async fn dispatch(&self, payload: &str) -> (usize, usize) {
        let up = self.pool.up();
        let client = &self.client;
        let results = join_all(up.iter().map(|worker| async move {
            let result = client.dispatch(&worker.base_url, payload).await;
            if let Err(e) = &result {
                tracing::warn!(worker = %worker.name, error = %e, "Dispatch to worker failed");
            }
            result.is_ok()
        }))
        .await;

        let ok = results.iter().filter(|ok| **ok).count();
        (ok, results.len() - ok)
    }

    /// Requests seen so far.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ScriptedDraws;
    use crate::config::WorkerConfig;
    use crate::peer::mock::{Call, RecordingClient};
    use url::Url;

    const A: &str = "http://127.0.0.1:9001/";
    const B: &str = "http://127.0.0.1:9002/";

    fn build(
        window_size: u32,
        threshold: u32,
        draws: ScriptedDraws,
    ) -> (LoadBalancerCycler, Arc<RecordingClient>) {
        let config = BalancerConfig {
            enabled: true,
            window_size,
            threshold,
            workers: vec![
                WorkerConfig {
                    name: "a".into(),
                    address: A.into(),
                },
                WorkerConfig {
                    name: "b".into(),
                    address: B.into(),
                },
            ],
            ..BalancerConfig::default()
        };
        let pool = Arc::new(WorkerPool::from_config(&config.workers).unwrap());
        let client = Arc::new(RecordingClient::new());
        let cycler = LoadBalancerCycler::new(pool, client.clone(), Arc::new(draws), &config);
        (cycler, client)
    }

    #[test]
    fn test_position_wraps_cycle() {
        let (cycler, _) = build(20, 60, ScriptedDraws::default());
        assert_eq!(cycler.position(1), 1);
        assert_eq!(cycler.position(21), 21);
        assert_eq!(cycler.position(80), 80);
        assert_eq!(cycler.position(81), 1);

        let (cycler, _) = build(1, 1, ScriptedDraws::default());
        assert_eq!(cycler.position(2), 2);
        assert_eq!(cycler.position(3), 1);
    }

    #[tokio::test]
    async fn test_highest_draw_is_switched_off() {
        let (cycler, client) = build(2, 2, ScriptedDraws::new([4, 2]));

        assert_eq!(
            cycler.handle_request("p1").await.action,
            CycleAction::StartedAll { started: vec![] }
        );
        assert_eq!(cycler.handle_request("p2").await.action, CycleAction::Steady);

        let report = cycler.handle_request("p3").await;
        assert_eq!(report.position, 3);
        assert_eq!(
            report.action,
            CycleAction::ShutDown {
                worker: "a".into(),
                draws: vec![4, 2],
            }
        );
        assert_eq!(report.dispatched, 1);
        assert!(client.calls().contains(&Call::SetAlive {
            worker: A.into(),
            alive: false,
        }));
        assert!(cycler.pool().get("b").unwrap().is_up());

        let report = cycler.handle_request("p5").await;
        assert_eq!(report.position, 4);
        assert_eq!(report.dispatched, 1);
        assert_eq!(
            client.calls().last(),
            Some(&Call::Dispatch {
                worker: B.into(),
                payload: "p5".into(),
            })
        );

        let report = cycler.handle_request("p6").await;
        assert_eq!(
            report.action,
            CycleAction::StartedAll {
                started: vec!["a".into()],
            }
        );
        assert_eq!(report.dispatched, 2);
        assert!(client.calls().contains(&Call::SetAlive {
            worker: A.into(),
            alive: true,
        }));
    }

    #[tokio::test]
    async fn test_tie_broken_by_pick() {
        let (cycler, _) = build(1, 1, ScriptedDraws::new([3, 3]).with_picks([1]));
        cycler.handle_request("p1").await;
        let report = cycler.handle_request("p2").await;
        assert_eq!(
            report.action,
            CycleAction::ShutDown {
                worker: "b".into(),
                draws: vec![3, 3],
            }
        );
    }

    #[tokio::test]
    async fn test_only_up_workers_are_candidates() {
        let (cycler, _) = build(1, 1, ScriptedDraws::new([1]));
        cycler
            .pool()
            .get("a")
            .unwrap()
            .set_state(WorkerState::Down);

        let action = cycler.shutdown_one().await;
        assert_eq!(
            action,
            CycleAction::ShutDown {
                worker: "b".into(),
                draws: vec![1],
            }
        );
        assert_eq!(cycler.shutdown_one().await, CycleAction::NoCandidate);
    }

    #[tokio::test]
    async fn test_failed_switch_off_keeps_worker_up() {
        let (cycler, client) = build(1, 1, ScriptedDraws::new([4, 2]));
        client.fail(&Url::parse(A).unwrap());
        cycler.handle_request("p1").await;

        let report = cycler.handle_request("p2").await;
        assert_eq!(
            report.action,
            CycleAction::ShutdownFailed {
                worker: "a".into(),
                draws: vec![4, 2],
            }
        );
        assert!(cycler.pool().get("a").unwrap().is_up());
        assert_eq!(cycler.pool().up().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_switch_on_leaves_worker_down() {
        let (cycler, client) = build(1, 1, ScriptedDraws::default());
        cycler.pool().get("a").unwrap().set_state(WorkerState::Down);
        client.fail(&Url::parse(A).unwrap());

        assert_eq!(cycler.start_all().await, CycleAction::StartedAll { started: vec![] });
        assert!(!cycler.pool().get("a").unwrap().is_up());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_isolated() {
        let (cycler, client) = build(20, 60, ScriptedDraws::default());
        client.fail(&Url::parse(A).unwrap());

        let report = cycler.handle_request("payload").await;
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.failed, 1);
        assert!(client.calls().contains(&Call::Dispatch {
            worker: B.into(),
            payload: "payload".into(),
        }));
    }
}
