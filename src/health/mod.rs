//! Peer health subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → GET /health on each peer
//!     → Peer::set_alive (cached liveness)
//!     → alert log on transition, pairwatch_peer_alive gauge
//! ```
//!
//! # Design Decisions
//! - Any non-2xx, transport error, or timeout counts as down
//! - Cached liveness is informational; arbitration always queries the peer

pub mod monitor;

pub use monitor::HealthMonitor;
