//! Petrel: a resilient fetch orchestrator
//!
//! This crate fetches remote pages under unreliable network conditions: it
//! tracks proxy endpoint health, adapts per-host request pacing, retries
//! transient failures with jittered backoff, scores extracted content for
//! quality and duplicates, and keeps rolling performance metrics with
//! threshold alerts.

pub mod config;
pub mod metrics;
pub mod output;
pub mod proxy;
pub mod quality;
pub mod rate;
pub mod retry;
pub mod robots;
pub mod scrape;

use thiserror::Error;

/// Main error type for petrel fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection refused for {url}")]
    ConnectionRefused { url: String },

    #[error("DNS resolution failed for {url}")]
    DnsFailure { url: String },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("No proxy endpoint available")]
    NoEndpointAvailable,

    #[error("Retries exhausted for {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Returns true if the server explicitly signalled rate limiting.
    ///
    /// HTTP 429 and 503 responses cause the rate controller to back off
    /// immediately rather than waiting for a failure streak.
    pub fn is_rate_limit_signal(&self) -> bool {
        matches!(self, Self::Http { status: 429, .. } | Self::Http { status: 503, .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid proxy endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type alias for petrel fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use metrics::{Alert, AlertKind, MetricsHub, MetricsSnapshot};
pub use proxy::{EndpointStatus, ProxyRegistry};
pub use quality::{QualityIssue, QualityReport, QualityValidator};
pub use rate::RateController;
pub use retry::{classify, ErrorClass, RetryPolicy};
pub use scrape::{Outcome, Record, ScrapeSession};
