//! Synthetic load subsystem.
//!
//! # Data Flow
//! ```text
//! interval tick → generator.rs (burst of 0..=max_burst)
//!     → RequestGovernor::accept (random payload)
//!     → stop on rejection / shutdown
//! ```

pub mod generator;

pub use generator::{random_payload, BurstOutcome, LoadGenerator};
