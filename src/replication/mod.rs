//! Replication subsystem.
//!
//! # Data Flow
//! ```text
//! RequestGovernor (accepted record)
//!     → sync.rs broadcast → POST /replica-intake on each peer
//!
//! POST /replica-intake
//!     → sync.rs apply_replicated → HealthStore::save_record (terminal)
//! ```

pub mod sync;

pub use sync::ReplicaSync;
