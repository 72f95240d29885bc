//! Worker abstraction.
//!
//! # Responsibilities
//! - Represent a single backend worker instance
//! - Track whether the cycler currently has it switched on

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use url::Url;

/// Worker switch state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Down = 0,
    Up = 1,
}

impl From<u8> for WorkerState {
    fn from(val: u8) -> Self {
        match val {
            1 => WorkerState::Up,
            _ => WorkerState::Down,
        }
    }
}

/// A single backend worker.
#[derive(Debug)]
pub struct Worker {
    pub name: String,
    pub base_url: Url,
    state: AtomicU8,
}

impl Worker {
    /// Workers start up.
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            state: AtomicU8::new(WorkerState::Up as u8),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn is_up(&self) -> bool {
        self.state() == WorkerState::Up
    }

    /// Returns the previous state.
    pub fn set_state(&self, state: WorkerState) -> WorkerState {
        WorkerState::from(self.state.swap(state as u8, Ordering::Relaxed))
    }
}

/// Serializable view of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerView {
    pub name: String,
    pub address: String,
    pub state: WorkerState,
}

impl From<&Worker> for WorkerView {
    fn from(worker: &Worker) -> Self {
        Self {
            name: worker.name.clone(),
            address: worker.base_url.to_string(),
            state: worker.state(),
        }
    }
}
