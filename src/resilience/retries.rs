//! Bounded retry logic.
//!
//! # Responsibilities
//! - Execute an operation up to `max_attempts` times
//! - Enforce a per-attempt deadline
//! - Sleep with exponential backoff + jitter between attempts
//!
//! # Design Decisions
//! - Only used for idempotent reads (the peer draw query)
//! - The final error is returned to the caller, which maps it to a sentinel

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

use crate::config::ArbitrationConfig;
use crate::resilience::timeouts::with_timeout;

/// Retry policy for a bounded operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<&ArbitrationConfig> for RetryPolicy {
    fn from(config: &ArbitrationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
            base_delay_ms: config.backoff_base_ms,
            max_delay_ms: config.backoff_max_ms,
        }
    }
}

/// Run `op` until it succeeds or the policy's attempts are exhausted.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<Elapsed> + Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match with_timeout(policy.attempt_timeout, op(attempt)).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(op = label, attempt, delay = ?delay, error = %e, "Retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::warn!(op = label, attempts = attempt, error = %e, "Retries exhausted");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Flaky(&'static str);

    impl Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl From<Elapsed> for Flaky {
        fn from(_: Elapsed) -> Self {
            Flaky("timeout")
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(500),
            base_delay_ms: 100,
            max_delay_ms: 500,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let result = retry(&policy(), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(Flaky("refused"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Flaky> = retry(&policy(), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        })
        .await;

        assert_eq!(result.unwrap_err().0, "timeout");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
