//! Run health: rolling sample window, aggregates, alerting

pub mod hub;
pub mod window;

pub use hub::{Alert, AlertKind, AlertSeverity, MetricsHub, MetricsSnapshot};
pub use window::{MetricSample, MetricWindow};
