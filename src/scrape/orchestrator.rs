//! Fetch orchestration
//!
//! [`ScrapeSession`] ties the subsystems together. Each URL walks the same
//! path: wait for its rate-limit turn, pick an egress endpoint, fetch,
//! then either back off and retry or extract, validate and record. Every
//! attempt feeds its outcome back into the registry, the rate controller
//! and the metrics hub, so the next attempt starts from what this one
//! learned.

use crate::config::{validate_config, Config};
use crate::metrics::{Alert, MetricSample, MetricsHub, MetricsSnapshot};
use crate::proxy::{EndpointOutcome, EndpointSnapshot, FailureKind, ProxyRegistry};
use crate::quality::{QualityReport, QualityValidator};
use crate::rate::RateController;
use crate::retry::{classify, RetryPolicy};
use crate::robots::RobotsGate;
use crate::scrape::extractor::{Extractor, HtmlExtractor, Record};
use crate::scrape::fetcher::{Fetcher, HttpFetcher};
use crate::FetchError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Terminal result for one URL
#[derive(Debug)]
pub enum Outcome {
    /// Fetched, extracted and validated. The report may still be failing;
    /// a low score is a result, not an error.
    Done {
        record: Record,
        report: QualityReport,
    },

    /// Gave up on the URL
    Failed { error: FetchError },

    /// The session was cancelled before this URL finished
    Cancelled,
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Done { .. } => "done",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A configured scraping session
///
/// Clones are cheap and share all state: the proxy pool, the learned
/// delays, the duplicate set and the metrics window. Construction rejects
/// a [`Config`] that fails validation.
#[derive(Clone)]
pub struct ScrapeSession {
    config: Arc<Config>,
    registry: Arc<ProxyRegistry>,
    rate: Arc<RateController>,
    validator: Arc<QualityValidator>,
    hub: Arc<MetricsHub>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    robots: Option<Arc<RobotsGate>>,
    policy: RetryPolicy,
    seen_hashes: Arc<Mutex<HashSet<String>>>,
    ua_counter: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl ScrapeSession {
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let extractor: Arc<dyn Extractor> = Arc::new(HtmlExtractor);
        Self::with_collaborators(config, fetcher, extractor)
    }

    /// Builds a session around caller-supplied transport and extraction;
    /// the configuration is validated first
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, FetchError> {
        validate_config(&config)?;
        let registry = Arc::new(ProxyRegistry::new(&config.proxy)?);
        let rate = Arc::new(RateController::new(&config.rate));
        let validator = Arc::new(QualityValidator::new(&config.quality));
        let hub = Arc::new(MetricsHub::new(&config.metrics));
        let robots = if config.fetch.respect_robots {
            Some(Arc::new(RobotsGate::new()?))
        } else {
            None
        };
        let policy = RetryPolicy::new(&config.retry);

        Ok(Self {
            config: Arc::new(config),
            registry,
            rate,
            validator,
            hub,
            fetcher,
            extractor,
            robots,
            policy,
            seen_hashes: Arc::new(Mutex::new(HashSet::new())),
            ua_counter: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
        })
    }

    /// Token observed at every suspension point; cancel it to wind down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.hub.snapshot()
    }

    pub fn pending_alerts(&self) -> Vec<Alert> {
        self.hub.pending_alerts()
    }

    pub fn drain_alerts(&self) -> Vec<Alert> {
        self.hub.drain_alerts()
    }

    pub fn proxy_snapshot(&self) -> Vec<EndpointSnapshot> {
        self.registry.snapshot()
    }

    /// Scrapes one URL to a terminal outcome
    pub async fn scrape(&self, url: &str) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Outcome::Failed {
                    error: FetchError::UrlParse(e),
                }
            }
        };

        match self.run_one(&parsed).await {
            Ok((record, report)) => Outcome::Done { record, report },
            Err(FetchError::Cancelled) => Outcome::Cancelled,
            Err(error) => {
                tracing::warn!("{} failed: {}", url, error);
                Outcome::Failed { error }
            }
        }
    }

    /// Scrapes a batch under a concurrency cap.
    ///
    /// Outcomes line up with the input by position regardless of completion
    /// order. One URL failing never disturbs its neighbors.
    pub async fn scrape_many(&self, urls: &[String], concurrency: usize) -> Vec<Outcome> {
        let concurrency = concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let session = self.clone();
            let semaphore = semaphore.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Outcome::Cancelled),
                };
                (index, session.scrape(&url).await)
            });
        }

        let mut outcomes: Vec<Option<Outcome>> = Vec::with_capacity(urls.len());
        outcomes.resize_with(urls.len(), || None);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::error!("scrape task panicked: {}", e),
            }
        }

        outcomes
            .into_iter()
            .map(|slot| slot.unwrap_or(Outcome::Cancelled))
            .collect()
    }

    /// Drives one URL through the attempt loop
    async fn run_one(&self, url: &Url) -> Result<(Record, QualityReport), FetchError> {
        if let Some(gate) = &self.robots {
            let allowed = tokio::select! {
                result = gate.is_allowed(url, &self.config.fetch.user_agents[0]) => result?,
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
            };
            if !allowed {
                tracing::info!("{} disallowed by robots.txt", url);
                return Err(FetchError::RobotsDenied {
                    url: url.to_string(),
                });
            }
        }

        let scope = self.rate.scope_key(url);
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            tracing::debug!("attempt {}/{} for {}", attempt + 1, max_attempts, url);
            self.rate.await_turn(&scope, &self.cancel).await?;

            let error = match self.attempt(url, &scope).await {
                Ok(done) => return Ok(done),
                Err(error) => error,
            };

            if matches!(error, FetchError::Cancelled) {
                return Err(error);
            }
            if !classify(&error).is_retryable() {
                return Err(error);
            }

            if attempt + 1 >= max_attempts {
                tracing::warn!(
                    "giving up on {} after {} attempts: {}",
                    url,
                    max_attempts,
                    error
                );
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: max_attempts,
                    last_error: error.to_string(),
                });
            }

            let delay = self.policy.next_delay(attempt);
            tracing::debug!("retrying {} in {:?} after: {}", url, delay, error);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
            }
            attempt += 1;
        }
    }

    /// One fetch attempt: select an endpoint, fetch, feed every subsystem
    /// the result
    async fn attempt(&self, url: &Url, scope: &str) -> Result<(Record, QualityReport), FetchError> {
        // Terminal for the URL when a configured pool is fully quarantined
        let selected = self.registry.select()?;
        match &selected {
            Some(proxy) => tracing::debug!("fetching {} via {}", url, proxy.address),
            None => tracing::debug!("fetching {} directly", url),
        }

        let user_agent = self.next_user_agent();
        let proxy_address = selected.as_ref().map(|s| &s.address);
        let started = Instant::now();

        let result = tokio::select! {
            result = self.fetcher.fetch(url.as_str(), proxy_address, user_agent) => result,
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
        };

        match result {
            Ok(response) => {
                if let Some(proxy) = &selected {
                    self.registry.report(
                        proxy.id,
                        EndpointOutcome::Success {
                            response_time_ms: response.elapsed_ms,
                        },
                    );
                }
                self.rate.report_outcome(scope, true, false).await;

                let record = self.extractor.extract(&response.body, url);
                let report = self.validate_and_remember(&record);
                self.hub
                    .record(MetricSample::success(response.elapsed_ms, report.score));

                if !report.is_valid {
                    tracing::debug!(
                        "{} scored {} with issues: {}",
                        url,
                        report.score,
                        format_issues(&report)
                    );
                }
                Ok((record, report))
            }
            Err(error) => {
                if let Some(proxy) = &selected {
                    if let Some(kind) = FailureKind::from_error(&error) {
                        self.registry
                            .report(proxy.id, EndpointOutcome::Failure { kind });
                    }
                }
                self.rate
                    .report_outcome(scope, false, error.is_rate_limit_signal())
                    .await;
                self.hub
                    .record(MetricSample::failure(started.elapsed().as_millis() as u64));
                Err(error)
            }
        }
    }

    /// Validates against the hashes seen so far; a record that passes joins
    /// the set, so the check-then-insert is atomic.
    fn validate_and_remember(&self, record: &Record) -> QualityReport {
        let mut seen = self.seen_hashes.lock().unwrap();
        let report = self.validator.validate(record, &seen);
        if report.is_valid {
            seen.insert(report.content_hash.clone());
        }
        report
    }

    fn next_user_agent(&self) -> &str {
        let agents = &self.config.fetch.user_agents;
        let index = self.ua_counter.fetch_add(1, Ordering::Relaxed) % agents.len();
        &agents[index]
    }
}

fn format_issues(report: &QualityReport) -> String {
    report
        .issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
