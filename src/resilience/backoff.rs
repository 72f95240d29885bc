//! Spacing between retried peer calls.
//!
//! Delays double per failed attempt up to the policy ceiling. A little
//! jitter keeps two nodes that failed together from retrying in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::resilience::retries::RetryPolicy;

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based) before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_after(attempt);
        let spread = ceiling / 10;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..spread)
        } else {
            0
        };
        Duration::from_millis(ceiling + jitter)
    }

    /// Un-jittered delay in milliseconds. No wait before the first attempt.
    fn ceiling_after(&self, attempt: u32) -> u64 {
        match attempt {
            0 => 0,
            n => self
                .base_delay_ms
                .saturating_mul(1u64 << (n - 1).min(63))
                .min(self.max_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArbitrationConfig;

    fn policy(base_delay_ms: u64, max_delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(50),
            base_delay_ms,
            max_delay_ms,
        }
    }

    #[test]
    fn test_delay_doubles_until_ceiling() {
        let policy = policy(100, 500);
        assert_eq!(policy.delay_after(0), Duration::ZERO);
        assert!((100..110).contains(&policy.delay_after(1).as_millis()));
        assert!((200..220).contains(&policy.delay_after(2).as_millis()));
        assert!((500..550).contains(&policy.delay_after(3).as_millis()));
        assert!((500..550).contains(&policy.delay_after(200).as_millis()));
    }

    #[test]
    fn test_short_delays_have_no_jitter() {
        let policy = policy(5, 9);
        assert_eq!(policy.delay_after(1), Duration::from_millis(5));
        assert_eq!(policy.delay_after(2), Duration::from_millis(9));
    }

    #[test]
    fn test_policy_from_arbitration_config_bounds_draw_retries() {
        let config = ArbitrationConfig::default();
        let policy = RetryPolicy::from(&config);
        let last = policy.delay_after(policy.max_attempts);
        assert!(last <= Duration::from_millis(config.backoff_max_ms + config.backoff_max_ms / 10));
    }
}
