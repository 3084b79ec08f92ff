//! Shared proxy pool with health-weighted selection
//!
//! All pool state sits behind one synchronous lock; no method awaits while
//! holding it, so the registry is safe to share across fetch tasks as a
//! plain `Arc<ProxyRegistry>`.

use super::endpoint::{EndpointOutcome, EndpointStatus, ProxyAddress, ProxyEndpoint};
use crate::config::ProxyConfig;
use crate::{ConfigError, FetchError};
use std::sync::Mutex;
use std::time::Instant;

/// Weight multiplier for the endpoint picked last, so traffic rotates
const RECENCY_PENALTY: f64 = 0.5;

/// Selection handed to a fetch attempt; `id` keys the outcome report back
#[derive(Debug, Clone)]
pub struct SelectedProxy {
    pub id: usize,
    pub address: ProxyAddress,
}

/// Read-only view of one endpoint, for summaries and tests
#[derive(Debug, Clone)]
pub struct EndpointSnapshot {
    pub address: String,
    pub status: EndpointStatus,
    pub health_score: f64,
    pub avg_response_time_ms: Option<f64>,
    pub quarantine_count: u32,
}

struct RegistryInner {
    endpoints: Vec<ProxyEndpoint>,
    last_selected: Option<usize>,
}

/// Tracks every configured egress endpoint and routes traffic toward the
/// healthy ones.
///
/// An empty pool is not an error: selection then yields `None`, meaning
/// requests go out directly. `NoEndpointAvailable` is only returned when a
/// configured pool has every endpoint quarantined at once.
pub struct ProxyRegistry {
    config: ProxyConfig,
    pool_size: usize,
    inner: Mutex<RegistryInner>,
}

impl ProxyRegistry {
    pub fn new(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let endpoints = config
            .endpoints
            .iter()
            .map(|raw| ProxyAddress::parse(raw).map(ProxyEndpoint::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config: config.clone(),
            pool_size: endpoints.len(),
            inner: Mutex::new(RegistryInner {
                endpoints,
                last_selected: None,
            }),
        })
    }

    /// Number of configured endpoints
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Picks the endpoint for the next request
    pub fn select(&self) -> Result<Option<SelectedProxy>, FetchError> {
        self.select_at(Instant::now())
    }

    /// Selection with an explicit clock
    pub fn select_at(&self, now: Instant) -> Result<Option<SelectedProxy>, FetchError> {
        if self.pool_size == 0 {
            return Ok(None);
        }

        let mut inner = self.inner.lock().unwrap();
        let last_selected = inner.last_selected;

        // Elapsed quarantines re-enter rotation before anything is picked
        for ep in inner.endpoints.iter_mut() {
            if ep.status == EndpointStatus::Quarantined && ep.quarantine_elapsed(now) {
                ep.release_from_quarantine();
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, ep) in inner.endpoints.iter().enumerate() {
            if ep.status == EndpointStatus::Quarantined {
                continue;
            }
            let mut weight = ep.health_score;
            if last_selected == Some(i) {
                weight *= RECENCY_PENALTY;
            }
            if best.map_or(true, |(_, w)| weight > w) {
                best = Some((i, weight));
            }
        }

        match best {
            Some((i, _)) => {
                inner.endpoints[i].last_selected_at = Some(now);
                inner.last_selected = Some(i);
                Ok(Some(SelectedProxy {
                    id: i,
                    address: inner.endpoints[i].address.clone(),
                }))
            }
            None => Err(FetchError::NoEndpointAvailable),
        }
    }

    /// Reports the outcome of a request made through `id`
    pub fn report(&self, id: usize, outcome: EndpointOutcome) {
        self.report_at(id, outcome, Instant::now());
    }

    /// Outcome report with an explicit clock
    pub fn report_at(&self, id: usize, outcome: EndpointOutcome, now: Instant) {
        let mut inner = self.inner.lock().unwrap();
        match inner.endpoints.get_mut(id) {
            Some(ep) => ep.apply_outcome(&outcome, now, &self.config),
            None => tracing::warn!("outcome report for unknown proxy id {}", id),
        }
    }

    /// Snapshot of every endpoint's state, in configuration order
    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner
            .endpoints
            .iter()
            .map(|ep| EndpointSnapshot {
                address: ep.address.to_string(),
                status: ep.status,
                health_score: ep.health_score,
                avg_response_time_ms: ep.avg_response_time_ms,
                quarantine_count: ep.quarantine_count,
            })
            .collect()
    }
}
