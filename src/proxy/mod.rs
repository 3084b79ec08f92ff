//! Proxy pool management
//!
//! [`ProxyRegistry`] owns the configured endpoints and picks one per request
//! by health-weighted selection; [`endpoint`] holds the per-endpoint state
//! machine (health score, degradation, quarantine with growing backoff).

pub mod endpoint;
pub mod registry;

pub use endpoint::{
    EndpointOutcome, EndpointStatus, FailureKind, ProxyAddress, ProxyEndpoint,
};
pub use registry::{EndpointSnapshot, ProxyRegistry, SelectedProxy};
