//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap peer and worker calls with a deadline
//! - Fold elapsed deadlines into the caller's error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Run `fut` with a deadline; an elapsed deadline becomes `E`.
pub async fn with_timeout<T, E, F>(duration: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(elapsed) => Err(E::from(elapsed)),
    }
}
