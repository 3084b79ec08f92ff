//! Rolling run health with edge-triggered alerting
//!
//! The hub records one sample per fetch attempt and checks the window
//! aggregates against configured thresholds. Each threshold latches: an
//! alert is queued once when the condition starts holding, and can only
//! fire again after the condition has cleared in between.

use super::window::{MetricSample, MetricWindow};
use crate::config::MetricsConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Which threshold was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    LowSuccessRate,
    HighLatency,
    LowQuality,
}

impl AlertKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LowSuccessRate => "low success rate",
            Self::HighLatency => "high latency",
            Self::LowQuality => "low quality",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Warning at the threshold, critical at twice the breach margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One queued threshold crossing
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time view of the window aggregates
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub samples: usize,
    pub success_rate: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub avg_quality_score: Option<f64>,
}

struct HubInner {
    window: MetricWindow,
    pending: Vec<Alert>,
    success_rate_latched: bool,
    latency_latched: bool,
    quality_latched: bool,
}

/// Session-wide metrics collector; safe to share as an `Arc`
pub struct MetricsHub {
    config: MetricsConfig,
    inner: Mutex<HubInner>,
}

impl MetricsHub {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            config: config.clone(),
            inner: Mutex::new(HubInner {
                window: MetricWindow::new(config.window_size),
                pending: Vec::new(),
                success_rate_latched: false,
                latency_latched: false,
                quality_latched: false,
            }),
        }
    }

    /// Records one fetch attempt and re-evaluates the alert thresholds
    pub fn record(&self, sample: MetricSample) {
        let mut inner = self.inner.lock().unwrap();
        inner.window.push(sample);
        self.evaluate(&mut inner);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();
        MetricsSnapshot {
            samples: inner.window.len(),
            success_rate: inner.window.success_rate(),
            avg_latency_ms: inner.window.avg_latency_ms(),
            avg_quality_score: inner.window.avg_quality_score(),
        }
    }

    /// Queued alerts, left in place
    pub fn pending_alerts(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().pending.clone()
    }

    /// Takes the queued alerts, emptying the queue
    pub fn drain_alerts(&self) -> Vec<Alert> {
        std::mem::take(&mut self.inner.lock().unwrap().pending)
    }

    fn evaluate(&self, inner: &mut HubInner) {
        // Too few samples to judge; one early failure must not page
        if inner.window.len() < self.config.min_samples {
            return;
        }

        if let Some(rate) = inner.window.success_rate() {
            let floor = self.config.success_rate_floor;
            let breached = rate < floor;
            if breached && !inner.success_rate_latched {
                let severity = severity_for(rate < floor / 2.0);
                push_alert(
                    inner,
                    AlertKind::LowSuccessRate,
                    severity,
                    format!("success rate {:.2} below floor {:.2}", rate, floor),
                );
            }
            inner.success_rate_latched = breached;
        }

        if let Some(latency) = inner.window.avg_latency_ms() {
            let ceiling = self.config.latency_ceiling_ms;
            let breached = latency > ceiling;
            if breached && !inner.latency_latched {
                let severity = severity_for(latency > ceiling * 2.0);
                push_alert(
                    inner,
                    AlertKind::HighLatency,
                    severity,
                    format!("average latency {:.0}ms above ceiling {:.0}ms", latency, ceiling),
                );
            }
            inner.latency_latched = breached;
        }

        if let Some(quality) = inner.window.avg_quality_score() {
            let floor = self.config.quality_floor;
            let breached = quality < floor;
            if breached && !inner.quality_latched {
                let severity = severity_for(quality < floor / 2.0);
                push_alert(
                    inner,
                    AlertKind::LowQuality,
                    severity,
                    format!("average quality {:.0} below floor {:.0}", quality, floor),
                );
            }
            inner.quality_latched = breached;
        }
    }
}

fn severity_for(critical: bool) -> AlertSeverity {
    if critical {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    }
}

fn push_alert(inner: &mut HubInner, kind: AlertKind, severity: AlertSeverity, message: String) {
    tracing::warn!("{} alert ({}): {}", kind, severity, message);
    inner.pending.push(Alert {
        kind,
        severity,
        message,
        timestamp: Utc::now(),
    });
}
