//! Adaptive request pacing
//!
//! Delays between requests are learned per scope: streaks of successes edge
//! the delay down, failures push it up, and explicit throttle responses
//! double it. [`RateController`] hands out turns; [`scope::ScopeState`]
//! holds the learned numbers.

pub mod controller;
pub mod scope;

pub use controller::RateController;
pub use scope::ScopeState;
