//! JSON result document sink

use super::traits::{OutputResult, PersistenceSink, RunReport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes the run report as a pretty-printed JSON document
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceSink for JsonSink {
    async fn persist(&self, report: &RunReport) -> OutputResult<()> {
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::info!(
            "wrote {} results to {}",
            report.results.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityReport;
    use crate::scrape::{Outcome, Record};

    fn sample_outcomes() -> (Vec<String>, Vec<Outcome>) {
        let urls = vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ];
        let outcomes = vec![
            Outcome::Done {
                record: Record {
                    title: Some("Title".to_string()),
                    paragraphs: vec!["text".to_string()],
                    ..Record::default()
                },
                report: QualityReport {
                    score: 72,
                    issues: vec![],
                    is_valid: true,
                    content_hash: "cafe".to_string(),
                },
            },
            Outcome::Cancelled,
        ];
        (urls, outcomes)
    }

    #[tokio::test]
    async fn test_persist_writes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let (urls, outcomes) = sample_outcomes();
        let report = RunReport::from_outcomes(&urls, &outcomes, "deadbeef");

        let sink = JsonSink::new(&path);
        sink.persist(&report).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();

        assert_eq!(value["metadata"]["config_hash"], "deadbeef");
        assert_eq!(value["metadata"]["totals"]["urls"], 2);
        assert_eq!(value["results"][0]["outcome"], "done");
        assert_eq!(value["results"][0]["record"]["title"], "Title");
        assert_eq!(value["results"][0]["report"]["score"], 72);
        assert_eq!(value["results"][1]["outcome"], "cancelled");
        // Absent fields are omitted, not null
        assert!(value["results"][1].get("record").is_none());
    }

    #[tokio::test]
    async fn test_persist_to_bad_path_errors() {
        let (urls, outcomes) = sample_outcomes();
        let report = RunReport::from_outcomes(&urls, &outcomes, "deadbeef");

        let sink = JsonSink::new("/nonexistent-dir/results.json");
        assert!(sink.persist(&report).await.is_err());
    }
}
