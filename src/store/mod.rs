//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! RequestGovernor / ReplicaSync
//!     → HealthStore trait
//!         - memory.rs (default, process-local)
//!         - file.rs (JSON file, reloaded at startup)
//! ```
//!
//! # Design Decisions
//! - Records are immutable once created; snapshots are upserted
//! - The "current" snapshot is the most recently created one
//! - Store calls are synchronous and short; callers hold the state lock

pub mod file;
pub mod memory;

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoordResult;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Identifier of an accepted request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Operational flag of a health snapshot. Absent means uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealthFlag {
    Crashed = 0,
    Operational = 1,
}

impl From<HealthFlag> for u8 {
    fn from(flag: HealthFlag) -> Self {
        flag as u8
    }
}

impl TryFrom<u8> for HealthFlag {
    type Error = String;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(HealthFlag::Crashed),
            1 => Ok(HealthFlag::Operational),
            other => Err(format!("invalid health flag {}", other)),
        }
    }
}

/// Per-node health aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub id: Uuid,
    /// Accepted requests, monotonic.
    pub request_count: u64,
    /// Overflow of the current window at the last accepted request.
    pub excess: u32,
    pub flag: Option<HealthFlag>,
}

impl HealthSnapshot {
    /// A fresh operational snapshot.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            request_count: 0,
            excess: 0,
            flag: Some(HealthFlag::Operational),
        }
    }

    /// True when the snapshot forbids new records.
    pub fn is_crashed(&self) -> bool {
        self.flag == Some(HealthFlag::Crashed)
    }
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// An accepted (or replicated) request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RecordId,
    pub payload: String,
    pub created_at: SystemTime,
    pub snapshot_id: Uuid,
}

impl RequestRecord {
    pub fn new(payload: impl Into<String>, snapshot_id: Uuid) -> Self {
        Self {
            id: RecordId::new(),
            payload: payload.into(),
            created_at: SystemTime::now(),
            snapshot_id,
        }
    }
}

/// Persistence collaborator consumed by the core.
pub trait HealthStore: Send + Sync {
    /// The most recently created snapshot, if any.
    fn load_latest_health(&self) -> CoordResult<Option<HealthSnapshot>>;

    /// Insert or update a snapshot.
    fn save_health(&self, snapshot: &HealthSnapshot) -> CoordResult<()>;

    /// Persist an immutable record.
    fn save_record(&self, record: &RequestRecord) -> CoordResult<()>;

    /// Number of stored records.
    fn record_count(&self) -> usize;
}
