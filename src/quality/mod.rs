//! Quality gating for extracted records

pub mod validator;

pub use validator::{QualityIssue, QualityReport, QualityValidator};
