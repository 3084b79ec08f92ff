//! Persistence interface and the run report document

use crate::quality::QualityReport;
use crate::scrape::{Outcome, Record};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while persisting results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Outcome counts for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTotals {
    pub urls: usize,

    /// Outcomes that reached validation
    pub done: usize,

    /// Done outcomes whose report passed
    pub valid: usize,

    pub failed: usize,
    pub cancelled: usize,
}

impl RunTotals {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut totals = Self {
            urls: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Done { report, .. } => {
                    totals.done += 1;
                    if report.is_valid {
                        totals.valid += 1;
                    }
                }
                Outcome::Failed { .. } => totals.failed += 1,
                Outcome::Cancelled => totals.cancelled += 1,
            }
        }
        totals
    }
}

/// Run-level context stored alongside the results
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    pub scraped_at: DateTime<Utc>,
    pub config_hash: String,
    pub totals: RunTotals,
}

/// One URL's slice of the report
#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub url: String,
    pub outcome: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<QualityReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The complete result document for one run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub results: Vec<ResultEntry>,
}

impl RunReport {
    /// Assembles the report; `urls` and `outcomes` correspond by position
    pub fn from_outcomes(urls: &[String], outcomes: &[Outcome], config_hash: &str) -> Self {
        let results = urls
            .iter()
            .zip(outcomes.iter())
            .map(|(url, outcome)| {
                let (record, report, error) = match outcome {
                    Outcome::Done { record, report } => {
                        (Some(record.clone()), Some(report.clone()), None)
                    }
                    Outcome::Failed { error } => (None, None, Some(error.to_string())),
                    Outcome::Cancelled => (None, None, None),
                };
                ResultEntry {
                    url: url.clone(),
                    outcome: outcome.label().to_string(),
                    record,
                    report,
                    error,
                }
            })
            .collect();

        Self {
            metadata: RunMetadata {
                scraped_at: Utc::now(),
                config_hash: config_hash.to_string(),
                totals: RunTotals::from_outcomes(outcomes),
            },
            results,
        }
    }
}

/// Where finished runs go. Implementations must be thread-safe.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn persist(&self, report: &RunReport) -> OutputResult<()>;
}
