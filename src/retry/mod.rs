//! Retry decisions: which failures get another attempt, and after how long

pub mod classify;
pub mod policy;

pub use classify::{classify, ErrorClass};
pub use policy::RetryPolicy;
