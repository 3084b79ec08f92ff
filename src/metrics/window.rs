//! Bounded sample window with derived aggregates

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// One observed fetch, success or failure
#[derive(Debug, Clone)]
pub struct MetricSample {
    pub success: bool,

    /// Wall time of the attempt, failures included
    pub latency_ms: u64,

    /// None when the fetch failed before validation
    pub quality_score: Option<u8>,

    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn success(latency_ms: u64, quality_score: u8) -> Self {
        Self {
            success: true,
            latency_ms,
            quality_score: Some(quality_score),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(latency_ms: u64) -> Self {
        Self {
            success: false,
            latency_ms,
            quality_score: None,
            timestamp: Utc::now(),
        }
    }
}

/// The most recent N samples; older ones fall off the far end.
///
/// Aggregates always cover at most `capacity` samples, never the full
/// history of the run.
#[derive(Debug)]
pub struct MetricWindow {
    capacity: usize,
    samples: VecDeque<MetricSample>,
}

impl MetricWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: MetricSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fraction of samples that succeeded, None on an empty window
    pub fn success_rate(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let successes = self.samples.iter().filter(|s| s.success).count();
        Some(successes as f64 / self.samples.len() as f64)
    }

    /// Mean latency over every sample, None on an empty window
    pub fn avg_latency_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: u64 = self.samples.iter().map(|s| s.latency_ms).sum();
        Some(total as f64 / self.samples.len() as f64)
    }

    /// Mean quality score over validated samples, None when there are none
    pub fn avg_quality_score(&self) -> Option<f64> {
        let scores: Vec<u8> = self.samples.iter().filter_map(|s| s.quality_score).collect();
        if scores.is_empty() {
            return None;
        }
        let total: u32 = scores.iter().map(|&s| s as u32).sum();
        Some(total as f64 / scores.len() as f64)
    }
}
