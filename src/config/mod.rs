//! Configuration module for petrel
//!
//! Handles loading, parsing, and validating TOML configuration files. Every
//! section has full defaults, so a missing or empty file yields a working
//! configuration.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, MetricsConfig, OutputConfig, ProxyConfig, QualityConfig, RateConfig,
    RateScopeMode, RetryConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_config, load_config, load_config_with_hash};

// Re-export validation for callers that assemble a Config in code
pub use validation::validate as validate_config;
