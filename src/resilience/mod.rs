//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a peer or worker:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On failure: retries.rs (bounded attempts, idempotent reads only)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every peer call has a deadline
//! - Fire-and-forget calls (broadcast, notifications) are never retried
//! - Exhausted retries surface as typed errors, never panics

pub mod backoff;
pub mod retries;
pub mod timeouts;
