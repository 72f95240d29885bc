//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pairwatch_admissions_total` (counter): admissions by outcome
//! - `pairwatch_window_excess` (gauge): overflow of the current window
//! - `pairwatch_arbitrations_total` (counter): rounds by verdict
//! - `pairwatch_replications_total` (counter): by direction and result
//! - `pairwatch_worker_up` (gauge): 1=up, 0=down per worker
//! - `pairwatch_peer_alive` (gauge): 1=alive, 0=down per peer
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests never need setup
//! - The Prometheus exporter runs its own HTTP listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::arbitration::Verdict;

pub const ADMISSIONS_TOTAL: &str = "pairwatch_admissions_total";
pub const WINDOW_EXCESS: &str = "pairwatch_window_excess";
pub const ARBITRATIONS_TOTAL: &str = "pairwatch_arbitrations_total";
pub const REPLICATIONS_TOTAL: &str = "pairwatch_replications_total";
pub const WORKER_UP: &str = "pairwatch_worker_up";
pub const PEER_ALIVE: &str = "pairwatch_peer_alive";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Admission outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted,
    Overloaded,
    RejectedDown,
    RejectedOverloaded,
    Replicated,
}

impl AdmissionOutcome {
    fn as_str(self) -> &'static str {
        match self {
            AdmissionOutcome::Accepted => "accepted",
            AdmissionOutcome::Overloaded => "overloaded",
            AdmissionOutcome::RejectedDown => "rejected_down",
            AdmissionOutcome::RejectedOverloaded => "rejected_overloaded",
            AdmissionOutcome::Replicated => "replicated",
        }
    }
}

pub fn record_admission(outcome: AdmissionOutcome) {
    metrics::counter!(ADMISSIONS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

pub fn set_window_excess(excess: u32) {
    metrics::gauge!(WINDOW_EXCESS).set(f64::from(excess));
}

pub fn record_arbitration(verdict: Verdict) {
    let outcome = match verdict {
        Verdict::Winner => "winner",
        Verdict::Loser => "loser",
    };
    metrics::counter!(ARBITRATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// `direction` is `outbound` or `inbound`.
pub fn record_replication(direction: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(REPLICATIONS_TOTAL, "direction" => direction, "result" => result)
        .increment(1);
}

pub fn set_worker_up(worker: &str, up: bool) {
    metrics::gauge!(WORKER_UP, "worker" => worker.to_string()).set(if up { 1.0 } else { 0.0 });
}

pub fn set_peer_alive(peer: &str, alive: bool) {
    metrics::gauge!(PEER_ALIVE, "peer" => peer.to_string()).set(if alive { 1.0 } else { 0.0 });
}
