//! Exponential backoff schedule for retryable failures

use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Attempt budget and backoff curve, derived from [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter_factor: config.jitter_factor,
        }
    }

    /// Total attempts allowed per URL, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deterministic backoff for the given zero-based attempt number
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay_ms)
    }

    /// Delay to sleep after attempt `attempt` failed.
    ///
    /// Doubles from the base delay, plus a random jitter share so parallel
    /// retries against one host spread out. Never exceeds the ceiling.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let backoff = self.backoff_ms(attempt);
        let span = (backoff as f64 * self.jitter_factor) as u64;
        let jitter = if span == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=span)
        };
        Duration::from_millis(backoff.saturating_add(jitter).min(self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base: u64, max: u64, jitter: f64) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: base,
            max_delay_ms: max,
            jitter_factor: jitter,
        })
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = policy(500, 30_000, 0.0);
        assert_eq!(policy.backoff_ms(0), 500);
        assert_eq!(policy.backoff_ms(1), 1_000);
        assert_eq!(policy.backoff_ms(2), 2_000);
        assert_eq!(policy.backoff_ms(3), 4_000);
    }

    #[test]
    fn test_backoff_caps_at_ceiling() {
        let policy = policy(500, 30_000, 0.0);
        assert_eq!(policy.backoff_ms(6), 30_000);
        assert_eq!(policy.backoff_ms(20), 30_000);
        // Huge attempt numbers must not overflow
        assert_eq!(policy.backoff_ms(u32::MAX), 30_000);
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let policy = policy(500, 30_000, 0.0);
        assert_eq!(policy.next_delay(1), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = policy(1_000, 30_000, 0.3);
        for _ in 0..50 {
            let delay = policy.next_delay(1).as_millis() as u64;
            assert!((2_000..=2_600).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_jitter_never_exceeds_ceiling() {
        let policy = policy(1_000, 2_100, 0.5);
        for _ in 0..50 {
            assert!(policy.next_delay(5) <= Duration::from_millis(2_100));
        }
    }

    #[test]
    fn test_max_attempts_carried_from_config() {
        assert_eq!(policy(500, 30_000, 0.0).max_attempts(), 3);
    }
}
