//! Per-node mutable state.
//!
//! Window, instance flags, and the current health snapshot live behind one
//! mutex so a tick, its snapshot update, and the breach check happen as one
//! step. The lock is never held across an `.await`.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::admission::window::WindowedCounter;
use crate::store::HealthSnapshot;

/// Liveness and role of this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceState {
    pub alive: bool,
    /// Only the active instance originates synthetic load.
    pub active: bool,
}

impl InstanceState {
    pub fn initial(identity: &str, active_identity: &str) -> Self {
        Self {
            alive: true,
            active: identity == active_identity,
        }
    }
}

#[derive(Debug)]
pub struct CoreState {
    pub window: WindowedCounter,
    pub instance: InstanceState,
    pub snapshot: HealthSnapshot,
    /// Set once a breach has triggered arbitration in the current window.
    pub breach_latched: bool,
}

impl CoreState {
    pub fn new(cap: NonZeroU32, window: Duration, instance: InstanceState, snapshot: HealthSnapshot) -> Self {
        Self {
            window: WindowedCounter::new(cap, window),
            instance,
            snapshot,
            breach_latched: false,
        }
    }
}

pub type SharedState = Arc<Mutex<CoreState>>;
