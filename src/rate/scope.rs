//! Per-scope pacing state
//!
//! A scope is one pacing domain (a host, or the whole run). The state is a
//! plain struct mutated under the controller's lock; every transition takes
//! explicit inputs so tests never depend on wall-clock time.

use crate::config::RateConfig;
use std::time::{Duration, Instant};

/// Multiplier applied after a success streak
const SPEEDUP_FACTOR: f64 = 0.9;

/// Pacing state for one scope
#[derive(Debug, Clone)]
pub struct ScopeState {
    /// Target gap between request starts, before jitter
    pub current_delay_ms: f64,

    /// Start of the most recent request in this scope
    pub last_request_at: Option<Instant>,

    pub consecutive_successes: u32,
}

impl ScopeState {
    pub fn new(initial_delay_ms: u64) -> Self {
        Self {
            current_delay_ms: initial_delay_ms as f64,
            last_request_at: None,
            consecutive_successes: 0,
        }
    }

    /// Time left before the next request may start, None when it may go now
    pub fn time_until_turn(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_at?;
        let target = last + delay;
        if now >= target {
            None
        } else {
            Some(target - now)
        }
    }

    /// Records that a request is starting now
    pub fn mark_request(&mut self, now: Instant) {
        self.last_request_at = Some(now);
    }

    /// Success: shrink the delay once a full streak accumulates
    pub fn record_success(&mut self, config: &RateConfig) {
        self.consecutive_successes += 1;
        if self.consecutive_successes >= config.success_streak {
            self.current_delay_ms *= SPEEDUP_FACTOR;
            self.consecutive_successes = 0;
            self.clamp(config);
        }
    }

    /// Failure without a throttle signal: grow the delay moderately
    pub fn record_failure(&mut self, config: &RateConfig) {
        self.current_delay_ms *= config.failure_growth;
        self.consecutive_successes = 0;
        self.clamp(config);
    }

    /// Explicit throttle signal from the target: grow the delay sharply
    pub fn record_rate_limit(&mut self, config: &RateConfig) {
        self.current_delay_ms *= config.rate_limit_growth;
        self.consecutive_successes = 0;
        self.clamp(config);
    }

    fn clamp(&mut self, config: &RateConfig) {
        self.current_delay_ms = self
            .current_delay_ms
            .clamp(config.min_delay_ms as f64, config.max_delay_ms as f64);
    }
}
