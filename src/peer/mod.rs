//! Peer communication subsystem.
//!
//! # Data Flow
//! ```text
//! CrashArbitrator   → fetch_draw     → GET  /peer-draw
//! InstanceLifecycle → notify_down    → POST /notify-down
//! ReplicaSync       → replicate      → POST /replica-intake
//! HealthMonitor     → check_health   → GET  /health
//! Cycler            → set_alive      → POST /alive
//!                   → dispatch       → POST /requests
//! ```
//!
//! # Design Decisions
//! - One `PeerClient` trait for peers and workers (same service, two granularities)
//! - Calls return typed `PeerError`s; callers decide between sentinel and log-and-drop
//! - registry.rs owns identities and cached liveness

pub mod client;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod registry;

pub use client::{PeerClient, PeerError};
pub use http::HttpPeerClient;
pub use registry::{Peer, PeerRegistry};
