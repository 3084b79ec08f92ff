//! Content quality scoring
//!
//! Scores an extracted record against structural expectations and flags
//! pages that look like bot challenges or duplicates. Pure functions over
//! the record; duplicate state is passed in by the caller.

use crate::config::QualityConfig;
use crate::scrape::Record;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

const TITLE_POINTS: i32 = 25;
const FULL_PARAGRAPH_POINTS: i32 = 35;
const PARTIAL_PARAGRAPH_POINTS: i32 = 15;
const FULL_TEXT_POINTS: i32 = 25;
const PARTIAL_TEXT_POINTS: i32 = 10;
const LINK_POINTS: i32 = 15;
const BOT_MARKER_PENALTY: i32 = 50;

const MIN_TITLE_LEN: usize = 6;
const FULL_PARAGRAPH_COUNT: usize = 3;
const FULL_TEXT_LEN: usize = 400;
const PARTIAL_TEXT_LEN: usize = 100;
const LINK_COUNT: usize = 2;

/// A specific way a page fell short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityIssue {
    MissingTitle,
    InsufficientParagraphs,
    InsufficientText,
    FewLinks,
    BotChallengeDetected,
    Duplicate,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MissingTitle => "missing or short title",
            Self::InsufficientParagraphs => "insufficient paragraphs",
            Self::InsufficientText => "insufficient text",
            Self::FewLinks => "few links",
            Self::BotChallengeDetected => "bot challenge detected",
            Self::Duplicate => "duplicate content",
        };
        write!(f, "{}", label)
    }
}

/// Verdict for one record
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    /// 0-100, higher is better
    pub score: u8,

    pub issues: Vec<QualityIssue>,

    /// Whether the record clears the threshold with no blocking issue
    /// (bot challenge or duplicate)
    pub is_valid: bool,

    /// Fingerprint of the normalized body text
    pub content_hash: String,
}

/// Scores records against the configured threshold and bot marker list
#[derive(Debug, Clone)]
pub struct QualityValidator {
    threshold: u8,
    bot_markers: Vec<String>,
}

impl QualityValidator {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            threshold: config.threshold,
            bot_markers: config
                .bot_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
        }
    }

    /// Scores one record. `seen_hashes` holds fingerprints of records already
    /// accepted this run; a hit marks this one as a duplicate.
    pub fn validate(&self, record: &Record, seen_hashes: &HashSet<String>) -> QualityReport {
        let mut score: i32 = 0;
        let mut issues = Vec::new();

        // A whitespace-padded or few-character title counts as absent
        let title_len = record
            .title
            .as_deref()
            .map(|t| t.trim().chars().count())
            .unwrap_or(0);
        if title_len >= MIN_TITLE_LEN {
            score += TITLE_POINTS;
        } else {
            issues.push(QualityIssue::MissingTitle);
        }

        let paragraphs = record.paragraphs.len();
        if paragraphs >= FULL_PARAGRAPH_COUNT {
            score += FULL_PARAGRAPH_POINTS;
        } else {
            if paragraphs >= 1 {
                score += PARTIAL_PARAGRAPH_POINTS;
            }
            issues.push(QualityIssue::InsufficientParagraphs);
        }

        let text_len = record.text_len();
        if text_len >= FULL_TEXT_LEN {
            score += FULL_TEXT_POINTS;
        } else {
            if text_len >= PARTIAL_TEXT_LEN {
                score += PARTIAL_TEXT_POINTS;
            }
            issues.push(QualityIssue::InsufficientText);
        }

        if record.links.len() >= LINK_COUNT {
            score += LINK_POINTS;
        } else {
            issues.push(QualityIssue::FewLinks);
        }

        let bot_challenge = self.contains_bot_marker(record);
        if bot_challenge {
            score -= BOT_MARKER_PENALTY;
            issues.push(QualityIssue::BotChallengeDetected);
        }

        let content_hash = Self::content_hash(record);
        let is_duplicate = seen_hashes.contains(&content_hash);

        let mut score = score.clamp(0, 100) as u8;
        if is_duplicate {
            // A duplicate can never be valid, whatever it scored
            score = score.min(self.threshold.saturating_sub(1));
            issues.push(QualityIssue::Duplicate);
        }

        QualityReport {
            score,
            issues,
            is_valid: score >= self.threshold && !bot_challenge && !is_duplicate,
            content_hash,
        }
    }

    /// Fingerprint of the record's body text: lowercased, whitespace folded,
    /// so trivial reformatting still collides.
    pub fn content_hash(record: &Record) -> String {
        let normalized = record
            .paragraphs
            .iter()
            .flat_map(|p| p.split_whitespace())
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn contains_bot_marker(&self, record: &Record) -> bool {
        let haystack = record
            .title
            .iter()
            .chain(record.headings.iter())
            .chain(record.paragraphs.iter())
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        self.bot_markers.iter().any(|m| haystack.contains(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> QualityValidator {
        QualityValidator::new(&QualityConfig::default())
    }

    fn rich_record() -> Record {
        Record {
            title: Some("Product Review".to_string()),
            headings: vec!["Overview".to_string()],
            paragraphs: vec![
                "a".repeat(150),
                "b".repeat(150),
                "c".repeat(150),
            ],
            links: vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ],
            images: vec![],
        }
    }

    #[test]
    fn test_rich_record_scores_full_marks() {
        let report = validator().validate(&rich_record(), &HashSet::new());
        assert_eq!(report.score, 100);
        assert!(report.is_valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_empty_record_scores_zero() {
        let report = validator().validate(&Record::default(), &HashSet::new());
        assert_eq!(report.score, 0);
        assert!(!report.is_valid);
        assert!(report.issues.contains(&QualityIssue::MissingTitle));
        assert!(report.issues.contains(&QualityIssue::InsufficientParagraphs));
        assert!(report.issues.contains(&QualityIssue::InsufficientText));
        assert!(report.issues.contains(&QualityIssue::FewLinks));
    }

    #[test]
    fn test_missing_title_loses_points() {
        let mut record = rich_record();
        record.title = None;

        let report = validator().validate(&record, &HashSet::new());
        assert_eq!(report.score, 75);
        assert!(report.issues.contains(&QualityIssue::MissingTitle));
    }

    #[test]
    fn test_short_title_earns_no_points() {
        let record = Record {
            title: Some("Ad".to_string()),
            paragraphs: vec!["x".repeat(120)],
            ..Record::default()
        };

        // 15 single paragraph + 10 short text; the two-character title
        // scores the same as none at all
        let report = validator().validate(&record, &HashSet::new());
        assert_eq!(report.score, 25);
        assert!(!report.is_valid);
        assert!(report.issues.contains(&QualityIssue::MissingTitle));
    }

    #[test]
    fn test_padded_title_is_measured_trimmed() {
        let mut record = rich_record();
        record.title = Some("  Home  ".to_string());

        let report = validator().validate(&record, &HashSet::new());
        assert_eq!(report.score, 75);
        assert!(report.issues.contains(&QualityIssue::MissingTitle));
    }

    #[test]
    fn test_partial_credit_for_thin_content() {
        let record = Record {
            title: Some("Harvest Notes".to_string()),
            paragraphs: vec!["d".repeat(150)],
            links: vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ],
            ..Record::default()
        };

        // 25 title + 15 single paragraph + 10 short text + 15 links
        let report = validator().validate(&record, &HashSet::new());
        assert_eq!(report.score, 65);
        assert!(report.is_valid);
        assert!(report.issues.contains(&QualityIssue::InsufficientParagraphs));
        assert!(report.issues.contains(&QualityIssue::InsufficientText));
    }

    #[test]
    fn test_bot_marker_sinks_the_score() {
        let mut record = rich_record();
        record.paragraphs[0] = format!("Please complete the CAPTCHA to continue. {}", "x".repeat(110));

        let report = validator().validate(&record, &HashSet::new());
        assert_eq!(report.score, 50);
        assert!(report.issues.contains(&QualityIssue::BotChallengeDetected));
        // Blocking issue: invalid even though the score sits at the threshold
        assert!(!report.is_valid);
    }

    #[test]
    fn test_bot_marker_match_is_case_insensitive() {
        let mut record = rich_record();
        record.headings = vec!["Access DENIED".to_string()];

        let report = validator().validate(&record, &HashSet::new());
        assert!(report.issues.contains(&QualityIssue::BotChallengeDetected));
    }

    #[test]
    fn test_score_never_goes_negative() {
        let validator = QualityValidator::new(&QualityConfig {
            threshold: 50,
            bot_markers: vec!["captcha".to_string()],
        });
        let record = Record {
            paragraphs: vec!["captcha".to_string()],
            ..Record::default()
        };

        let report = validator.validate(&record, &HashSet::new());
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_duplicate_is_capped_below_threshold() {
        let record = rich_record();
        let first = validator().validate(&record, &HashSet::new());
        assert!(first.is_valid);

        let mut seen = HashSet::new();
        seen.insert(first.content_hash.clone());

        let second = validator().validate(&record, &seen);
        assert_eq!(second.score, 49);
        assert!(!second.is_valid);
        assert!(second.issues.contains(&QualityIssue::Duplicate));
        assert_eq!(second.content_hash, first.content_hash);
    }

    #[test]
    fn test_content_hash_ignores_case_and_spacing() {
        let a = Record {
            paragraphs: vec!["Hello   World".to_string(), "second para".to_string()],
            ..Record::default()
        };
        let b = Record {
            paragraphs: vec!["hello world".to_string(), "SECOND  PARA".to_string()],
            ..Record::default()
        };

        assert_eq!(
            QualityValidator::content_hash(&a),
            QualityValidator::content_hash(&b)
        );
    }

    #[test]
    fn test_content_hash_differs_for_different_text() {
        let a = Record {
            paragraphs: vec!["alpha".to_string()],
            ..Record::default()
        };
        let b = Record {
            paragraphs: vec!["beta".to_string()],
            ..Record::default()
        };

        assert_ne!(
            QualityValidator::content_hash(&a),
            QualityValidator::content_hash(&b)
        );
    }

    #[test]
    fn test_score_at_threshold_is_valid() {
        let validator = QualityValidator::new(&QualityConfig {
            threshold: 40,
            bot_markers: vec![],
        });
        let record = Record {
            title: Some("Late Frost".to_string()),
            paragraphs: vec!["short".to_string()],
            ..Record::default()
        };

        // 25 title + 15 single paragraph
        let report = validator.validate(&record, &HashSet::new());
        assert_eq!(report.score, 40);
        assert!(report.is_valid);
    }
}
