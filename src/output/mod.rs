//! Result persistence and run summaries
//!
//! A finished run becomes a [`RunReport`] (metadata plus one entry per
//! URL), handed to a [`PersistenceSink`]. [`stats`] renders the console
//! summary.

pub mod json;
pub mod stats;
mod traits;

pub use json::JsonSink;
pub use stats::print_run_summary;
pub use traits::{
    OutputError, OutputResult, PersistenceSink, ResultEntry, RunMetadata, RunReport, RunTotals,
};
