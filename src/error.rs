//! Crate-wide error taxonomy.
//!
//! # Propagation
//! - `InvalidConfiguration` is fatal and only ever raised at startup
//! - `PeerUnreachable` is logged and mapped to a sentinel outcome by callers
//! - `Store` surfaces persistence failures from the storage collaborator

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Errors raised by the coordination core.
#[derive(Debug, Error)]
pub enum CoordError {
    /// Configuration failed semantic validation.
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfiguration(Vec<ValidationError>),

    /// A peer or worker could not be reached.
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// The persistence collaborator failed.
    #[error("store error: {0}")]
    Store(String),
}

pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for coordination operations.
pub type CoordResult<T> = Result<T, CoordError>;
