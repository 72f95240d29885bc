//! Periodic synthetic load.
//!
//! # Responsibilities
//! - Every interval, issue a random-size burst of requests to the local governor
//! - Space the burst evenly across the interval
//! - Stop a burst on the first rejection or on shutdown
//!
//! # Design Decisions
//! - Runs as its own task; request serving never waits on it
//! - Only the active, alive instance generates load

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::admission::{Admission, RejectReason, RequestGovernor};
use crate::config::LoadGeneratorConfig;

/// How a burst ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BurstOutcome {
    Completed { sent: u32 },
    /// A request was refused; the rest of the burst was dropped.
    Halted { sent: u32, reason: Option<RejectReason> },
    Cancelled { sent: u32 },
    /// Passive or down; nothing sent.
    Skipped,
}

/// Random lowercase ASCII letters.
pub fn random_payload(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

pub struct LoadGenerator {
    governor: Arc<RequestGovernor>,
    interval: Duration,
    max_burst: u32,
    payload_len: usize,
}

impl LoadGenerator {
    pub fn new(governor: Arc<RequestGovernor>, config: &LoadGeneratorConfig) -> Self {
        Self {
            governor,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            max_burst: config.max_burst,
            payload_len: config.payload_len,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            max_burst = self.max_burst,
            "Load generator starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let size = rand::thread_rng().gen_range(0..=self.max_burst);
                    if let BurstOutcome::Cancelled { .. } = self.run_burst(size, &mut shutdown).await {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Load generator received shutdown signal, exiting loop");
    }

    /// Send `size` requests spaced evenly over one interval.
    pub async fn run_burst(&self, size: u32, shutdown: &mut broadcast::Receiver<()>) -> BurstOutcome {
        let instance = self.governor.instance();
        if !instance.alive || !instance.active {
            tracing::debug!(alive = instance.alive, active = instance.active, "Burst skipped");
            return BurstOutcome::Skipped;
        }
        if size == 0 {
            return BurstOutcome::Completed { sent: 0 };
        }

        let spacing = self.interval / size;
        let mut sent = 0;
        tracing::debug!(size, spacing = ?spacing, "Burst starting");

        for i in 0..size {
            match self.governor.accept(random_payload(self.payload_len)).await {
                Ok(Admission::Accepted { .. }) => sent += 1,
                Ok(Admission::Rejected(reason)) => {
                    tracing::info!(sent, reason = ?reason, "Burst halted by rejection");
                    return BurstOutcome::Halted {
                        sent,
                        reason: Some(reason),
                    };
                }
                Err(e) => {
                    tracing::error!(sent, error = %e, "Burst halted by error");
                    return BurstOutcome::Halted { sent, reason: None };
                }
            }

            if i + 1 < size {
                tokio::select! {
                    _ = time::sleep(spacing) => {}
                    _ = shutdown.recv() => return BurstOutcome::Cancelled { sent },
                }
            }
        }

        BurstOutcome::Completed { sent }
    }
}
