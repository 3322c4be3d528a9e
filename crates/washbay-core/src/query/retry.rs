// ── Retry policy ──
//
// Exponential backoff for failed fetches, with fail-fast classification.

use std::time::Duration;

use super::error::FetchError;

/// Exponential backoff configuration for failed fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum additional attempts after the first failure. Default: 3.
    pub attempts: u32,

    /// Base delay; attempt `n` (zero-based) waits `base * 2^n`. Default: 1s.
    pub base_delay: Duration,

    /// Upper bound on any single delay. Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            attempts: 0,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows `attempts_made` earlier retries.
    ///
    /// `delay = min(base * 2^attempts_made, max)`
    pub fn delay_for(&self, attempts_made: u32) -> Duration {
        1u32.checked_shl(attempts_made)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether `err` may be retried after `attempts_made` earlier retries.
    pub fn should_retry(&self, err: &FetchError, attempts_made: u32) -> bool {
        err.is_retryable() && attempts_made < self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..5).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for(31), Duration::from_secs(30));
        // Shift overflow saturates at the cap instead of wrapping.
        assert_eq!(policy.delay_for(64), Duration::from_secs(30));
    }

    #[test]
    fn retries_transient_errors_until_budget_spent() {
        let policy = RetryPolicy {
            attempts: 2,
            ..RetryPolicy::default()
        };
        let err = FetchError::new("connection reset");
        assert!(policy.should_retry(&err, 0));
        assert!(policy.should_retry(&err, 1));
        assert!(!policy.should_retry(&err, 2));
    }

    #[test]
    fn never_retries_client_or_validation_errors() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(&FetchError::with_status("gone", 404), 0));
        assert!(!policy.should_retry(&FetchError::new("invalid date"), 0));
    }

    #[test]
    fn none_policy_fails_fast() {
        assert!(!RetryPolicy::none().should_retry(&FetchError::new("timeout"), 0));
    }
}
