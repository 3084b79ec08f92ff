//! Petrel main entry point
//!
//! This is the command-line interface for the petrel fetch orchestrator.

use anyhow::Context;
use clap::Parser;
use petrel::config::{hash_config, load_config_with_hash, Config};
use petrel::output::{print_run_summary, JsonSink, PersistenceSink, RunReport};
use petrel::proxy::ProxyAddress;
use petrel::scrape::ScrapeSession;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Petrel: a resilient fetch orchestrator
///
/// Petrel fetches batches of URLs through a health-tracked proxy pool with
/// adaptive per-host pacing, retries transient failures with jittered
/// backoff, and scores every extracted page for quality before writing
/// the run's result document.
#[derive(Parser, Debug)]
#[command(name = "petrel")]
#[command(version = "0.3.0")]
#[command(about = "A resilient fetch orchestrator", long_about = None)]
struct Cli {
    /// URLs to fetch
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// File with one URL per line; '#' starts a comment
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the JSON result document (overrides the config)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of URLs processed concurrently (overrides the config)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => {
            let config = Config::default();
            let hash = hash_config(&config)?;
            (config, hash)
        }
    };

    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }

    let urls = collect_urls(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config, &urls);
        return Ok(());
    }

    if urls.is_empty() {
        anyhow::bail!("no URLs given; pass them as arguments or with --input");
    }

    run(config, config_hash, urls).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("petrel=info,warn"),
            1 => EnvFilter::new("petrel=debug,info"),
            2 => EnvFilter::new("petrel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges positional URLs with the lines of the --input file
fn collect_urls(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let mut urls = cli.urls.clone();

    if let Some(path) = &cli.input {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            urls.push(line.to_string());
        }
    }

    Ok(urls)
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config, urls: &[String]) {
    println!("=== Petrel Dry Run ===\n");

    println!("Fetch:");
    println!("  Timeout: {}ms", config.fetch.timeout_ms);
    println!("  User agents: {}", config.fetch.user_agents.len());
    println!("  Respect robots.txt: {}", config.fetch.respect_robots);

    println!("\nRate Pacing:");
    println!("  Initial delay: {}ms", config.rate.initial_delay_ms);
    println!(
        "  Delay bounds: {}ms - {}ms",
        config.rate.min_delay_ms, config.rate.max_delay_ms
    );
    println!("  Scope: {:?}", config.rate.scope_mode);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms base, {}ms cap",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nProxy Endpoints ({}):", config.proxy.endpoints.len());
    if config.proxy.endpoints.is_empty() {
        println!("  (none; requests egress directly)");
    }
    for endpoint in &config.proxy.endpoints {
        // Parsed so credentials stay out of the console
        if let Ok(address) = ProxyAddress::parse(endpoint) {
            println!("  - {}", address);
        }
    }

    println!("\nQuality:");
    println!("  Threshold: {}", config.quality.threshold);
    println!("  Bot markers: {}", config.quality.bot_markers.len());

    println!("\nMetrics:");
    println!(
        "  Window: {} samples (alerts after {})",
        config.metrics.window_size, config.metrics.min_samples
    );

    println!("\nOutput:");
    println!("  Results: {}", config.output.path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch {} URLs with concurrency {}",
        urls.len(),
        config.concurrency
    );
}

/// Runs the session over the URL batch and persists the result document
async fn run(config: Config, config_hash: String, urls: Vec<String>) -> anyhow::Result<()> {
    let concurrency = config.concurrency;
    let output_path = config.output.path.clone();

    tracing::info!(
        "Fetching {} URLs with concurrency {}",
        urls.len(),
        concurrency
    );

    let session = ScrapeSession::new(config)?;

    // On Ctrl-C, in-flight URLs stop at their next suspension point and
    // unstarted ones report as cancelled; the partial run is still written.
    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, winding down outstanding fetches");
            token.cancel();
        }
    });

    let outcomes = session.scrape_many(&urls, concurrency).await;

    let report = RunReport::from_outcomes(&urls, &outcomes, &config_hash);
    let sink = JsonSink::new(&output_path);
    sink.persist(&report)
        .await
        .with_context(|| format!("failed to write results to {}", output_path))?;

    print_run_summary(
        &report.metadata.totals,
        &session.metrics_snapshot(),
        &session.drain_alerts(),
        &session.proxy_snapshot(),
    );

    Ok(())
}
