//! Retry budget and backoff delays for embedding requests

use std::time::Duration;

use rand::{Rng, thread_rng};

/// Exponential backoff policy
///
/// Attempts are indexed from zero. The delay after attempt `n` is
/// `base_delay * 2^n`, so with the default one second base the waits are 1s, 2s,
/// 4s and so on. A provider-supplied hint replaces the computed delay.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay after the first failed attempt
    pub base_delay: Duration,

    /// Upper bound on computed delays
    pub max_delay: Option<Duration>,

    /// Randomize computed delays by ±20%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: None,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Same timing with a different retry budget
    pub fn with_max_retries(&self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self.clone()
        }
    }

    /// Total number of attempts, including the first
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt may follow attempt `attempt`
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Computed delay after attempt `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let mut delay = self.base_delay.saturating_mul(factor);

        if self.jitter && !delay.is_zero() {
            delay = delay.mul_f64(thread_rng().gen_range(0.8..1.2));
        }

        match self.max_delay {
            Some(max_delay) => delay.min(max_delay),
            None => delay,
        }
    }

    /// Delay after attempt `attempt`, preferring the provider's hint when present
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        hint.unwrap_or_else(|| self.backoff(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.total_attempts(), 4);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_delay: Some(Duration::from_secs(3)),
            ..RetryPolicy::default()
        };

        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(5), Duration::from_secs(3));
        assert_eq!(policy.backoff(40), Duration::from_secs(3));
    }

    #[test]
    fn test_hint_overrides_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.delay_for(2, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            jitter: true,
            ..RetryPolicy::default()
        };

        for _ in 0..50 {
            let delay = policy.backoff(1);
            assert!(delay >= Duration::from_millis(1600));
            assert!(delay <= Duration::from_millis(2400));
        }
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default().with_max_retries(1);

        assert_eq!(policy.total_attempts(), 2);
        assert!(policy.has_attempts_after(0));
        assert!(!policy.has_attempts_after(1));

        let single = policy.with_max_retries(0);
        assert_eq!(single.total_attempts(), 1);
        assert!(!single.has_attempts_after(0));
        assert_eq!(single.base_delay, policy.base_delay);
    }
}
