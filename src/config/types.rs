use serde::{Deserialize, Serialize};

/// Main configuration structure for petrel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of URLs processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub rate: RateConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            rate: RateConfig::default(),
            retry: RetryConfig::default(),
            proxy: ProxyConfig::default(),
            quality: QualityConfig::default(),
            metrics: MetricsConfig::default(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

/// How pacing state is keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateScopeMode {
    /// One pacing state per target host
    PerHost,
    /// A single pacing state shared by every request
    Global,
}

/// Adaptive request pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Floor for the adaptive inter-request delay (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Ceiling for the adaptive inter-request delay (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Delay a fresh scope starts from (milliseconds)
    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    /// Consecutive successes required before the delay shrinks
    #[serde(rename = "success-streak")]
    pub success_streak: u32,

    /// Multiplier applied to the delay on an ordinary failure
    #[serde(rename = "failure-growth")]
    pub failure_growth: f64,

    /// Multiplier applied when the server signals rate limiting (429/503)
    #[serde(rename = "rate-limit-growth")]
    pub rate_limit_growth: f64,

    /// Symmetric jitter applied at wait time (0.2 means +/- 20%)
    #[serde(rename = "jitter-pct")]
    pub jitter_pct: f64,

    /// Whether pacing is tracked per host or globally
    #[serde(rename = "scope-mode")]
    pub scope_mode: RateScopeMode,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 10_000,
            initial_delay_ms: 1_000,
            success_streak: 3,
            failure_growth: 1.5,
            rate_limit_growth: 2.0,
            jitter_pct: 0.2,
            scope_mode: RateScopeMode::PerHost,
        }
    }
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total fetch attempts per URL before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff delay for the first retry (milliseconds)
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single backoff delay (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Random jitter added on top of the computed delay, as a fraction of it
    #[serde(rename = "jitter-factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.3,
        }
    }
}

/// Proxy pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy endpoint URLs. Empty means all requests egress directly.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Consecutive failures that quarantine an endpoint
    #[serde(rename = "quarantine-threshold")]
    pub quarantine_threshold: u32,

    /// Consecutive successes that promote a degraded endpoint back to healthy
    #[serde(rename = "recovery-threshold")]
    pub recovery_threshold: u32,

    /// First quarantine window (seconds); doubles per repeat quarantine
    #[serde(rename = "quarantine-base-secs")]
    pub quarantine_base_secs: u64,

    /// Cap on the quarantine window (seconds)
    #[serde(rename = "quarantine-max-secs")]
    pub quarantine_max_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            quarantine_threshold: 5,
            recovery_threshold: 3,
            quarantine_base_secs: 30,
            quarantine_max_secs: 480,
        }
    }
}

/// Content quality scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Minimum score for a report to count as valid
    pub threshold: u8,

    /// Lower-cased text fragments that mark a bot-challenge interstitial
    #[serde(rename = "bot-markers", default = "default_bot_markers")]
    pub bot_markers: Vec<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            bot_markers: default_bot_markers(),
        }
    }
}

fn default_bot_markers() -> Vec<String> {
    [
        "captcha",
        "access denied",
        "verify you are human",
        "unusual traffic",
        "attention required",
        "robot check",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Rolling metrics and alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Number of most recent samples aggregates are computed over
    #[serde(rename = "window-size")]
    pub window_size: usize,

    /// Samples required in the window before alerts are evaluated
    #[serde(rename = "min-samples")]
    pub min_samples: usize,

    /// Success rate below this raises LowSuccessRate
    #[serde(rename = "success-rate-floor")]
    pub success_rate_floor: f64,

    /// Average latency above this raises HighLatency (milliseconds)
    #[serde(rename = "latency-ceiling-ms")]
    pub latency_ceiling_ms: f64,

    /// Average quality score below this raises LowQuality
    #[serde(rename = "quality-floor")]
    pub quality_floor: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            min_samples: 10,
            success_rate_floor: 0.5,
            latency_ceiling_ms: 5_000.0,
            quality_floor: 40.0,
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User agents rotated across attempts
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Consult robots.txt before fetching
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agents: default_user_agents(),
            respect_robots: false,
        }
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path the JSON result document is written to
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./results.json".to_string(),
        }
    }
}
