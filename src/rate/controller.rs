//! Adaptive pacing across fetch tasks
//!
//! The controller serializes turns within a scope by holding that scope's
//! lock across the pacing sleep. Waiters queue on the lock, so each one
//! re-reads the delay that earlier outcomes left behind.

use super::scope::ScopeState;
use crate::config::{RateConfig, RateScopeMode};
use crate::FetchError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Shared pacing controller, one per session
pub struct RateController {
    config: RateConfig,
    scopes: Mutex<HashMap<String, Arc<Mutex<ScopeState>>>>,
}

impl RateController {
    pub fn new(config: &RateConfig) -> Self {
        Self {
            config: config.clone(),
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Pacing scope a URL belongs to
    pub fn scope_key(&self, url: &Url) -> String {
        match self.config.scope_mode {
            RateScopeMode::Global => "global".to_string(),
            RateScopeMode::PerHost => url
                .host_str()
                .map(|host| host.to_ascii_lowercase())
                .unwrap_or_else(|| "global".to_string()),
        }
    }

    /// Blocks until this scope's next turn comes up, then claims it.
    ///
    /// The stored delay is jittered fresh for every wait, so the effective
    /// gap varies while the learned value stays stable.
    pub async fn await_turn(
        &self,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let state = self.scope_state(scope).await;
        // Held across the sleep: one waiter per scope proceeds at a time
        let mut state = state.lock().await;

        let delay = jittered_delay(state.current_delay_ms, self.config.jitter_pct);
        if let Some(remaining) = state.time_until_turn(delay, Instant::now()) {
            tracing::trace!("scope {} waiting {:?} for its turn", scope, remaining);
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            }
        }
        state.mark_request(Instant::now());
        Ok(())
    }

    /// Feeds one request outcome back into the scope's delay
    pub async fn report_outcome(&self, scope: &str, success: bool, rate_limit_signal: bool) {
        let state = self.scope_state(scope).await;
        let mut state = state.lock().await;
        if rate_limit_signal {
            state.record_rate_limit(&self.config);
        } else if success {
            state.record_success(&self.config);
        } else {
            state.record_failure(&self.config);
        }
        tracing::trace!(
            "scope {} delay now {:.0}ms",
            scope,
            state.current_delay_ms
        );
    }

    /// Current learned delay for a scope, if it has seen traffic
    pub async fn current_delay_ms(&self, scope: &str) -> Option<f64> {
        let state = {
            let scopes = self.scopes.lock().await;
            scopes.get(scope).cloned()
        };
        match state {
            Some(state) => Some(state.lock().await.current_delay_ms),
            None => None,
        }
    }

    async fn scope_state(&self, scope: &str) -> Arc<Mutex<ScopeState>> {
        let mut scopes = self.scopes.lock().await;
        scopes
            .entry(scope.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ScopeState::new(self.config.initial_delay_ms))))
            .clone()
    }
}

/// Applies symmetric jitter to the stored delay
fn jittered_delay(delay_ms: f64, jitter_pct: f64) -> Duration {
    let factor = if jitter_pct > 0.0 {
        rand::thread_rng().gen_range(1.0 - jitter_pct..=1.0 + jitter_pct)
    } else {
        1.0
    };
    Duration::from_millis((delay_ms * factor).max(0.0) as u64)
}
