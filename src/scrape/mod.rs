//! The fetch pipeline: transport, extraction, orchestration

pub mod extractor;
pub mod fetcher;
pub mod orchestrator;

pub use extractor::{Extractor, HtmlExtractor, Record};
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use orchestrator::{Outcome, ScrapeSession};
