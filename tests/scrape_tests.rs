//! Integration tests for the fetch pipeline
//!
//! These tests use wiremock to stand in for origin servers and drive
//! the session end-to-end: pacing, endpoint selection, retries,
//! extraction, validation and the result document.

use petrel::metrics::AlertSeverity;
use petrel::output::{JsonSink, PersistenceSink, RunReport};
use petrel::{AlertKind, Config, EndpointStatus, FetchError, Outcome, QualityIssue, ScrapeSession};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the shortest legal delays and no jitter
fn fast_config() -> Config {
    let mut config = Config::default();
    config.rate.min_delay_ms = 10;
    config.rate.initial_delay_ms = 10;
    config.rate.max_delay_ms = 200;
    config.rate.jitter_pct = 0.0;
    config.retry.base_delay_ms = 5;
    config.retry.max_delay_ms = 40;
    config.retry.jitter_factor = 0.0;
    config.fetch.timeout_ms = 5_000;
    config.fetch.user_agents = vec!["petrel-test/1.0".to_string()];
    config
}

/// A page that earns a full quality score: title, three substantial
/// paragraphs and two links
const PAGE_HARBOR: &str = r#"<html><head><title>Harbor Logistics Review</title></head><body>
<h1>Harbor Logistics Review</h1>
<p>Container throughput at the northern terminal rose again this quarter, driven by rerouted traffic from congested southern berths and a new crane schedule that keeps two gangs working every vessel through the night shift.</p>
<p>Dwell times tell a different story. Import boxes now sit an average of four days on the yard, a figure the operations team attributes to chassis shortages rather than customs holds or documentation errors at the gate.</p>
<p>The port authority plans to publish revised tariff schedules before the end of the fiscal year, and carriers have already signalled that surcharges will follow wherever storage fees climb faster than handling productivity.</p>
<a href="/schedules">Sailing schedules</a>
<a href="/tariffs">Tariff notices</a>
</body></html>"#;

/// A second full-score page with different body text, so its content
/// fingerprint differs from [`PAGE_HARBOR`]
const PAGE_ORCHARD: &str = r#"<html><head><title>Orchard Irrigation Notes</title></head><body>
<h1>Orchard Irrigation Notes</h1>
<p>Drip lines in the east block ran four hours longer than scheduled last week because the soil probes under the older rootstock kept reading dry well after the surface had visibly saturated.</p>
<p>The agronomist recommends splitting the block into two zones so the younger trees stop receiving the deficit schedule designed for established canopies with much deeper root systems.</p>
<p>Water budgeting for the season still assumes the district allocation announced in March, and any midsummer revision would force the pumps onto the overnight tariff to stay inside it.</p>
<a href="/zones">Zone map</a>
<a href="/allocation">Allocation notice</a>
</body></html>"#;

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_batch_preserves_order_amid_failures() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Healthy pages; the user-agent matcher doubles as a check that the
    // configured agent is actually sent
    Mock::given(method("GET"))
        .and(path("/port"))
        .and(header("user-agent", "petrel-test/1.0"))
        .respond_with(html_response(PAGE_HARBOR))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fruit"))
        .respond_with(html_response(PAGE_ORCHARD))
        .mount(&mock_server)
        .await;

    // A persistently broken page; should be attempted exactly max_attempts times
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let session = ScrapeSession::new(fast_config()).expect("Failed to create session");

    let urls = vec![
        format!("{}/port", base_url),
        format!("{}/down", base_url),
        format!("{}/fruit", base_url),
    ];
    let outcomes = session.scrape_many(&urls, 2).await;

    assert_eq!(outcomes.len(), 3);

    match &outcomes[0] {
        Outcome::Done { record, report } => {
            assert_eq!(record.title.as_deref(), Some("Harbor Logistics Review"));
            assert_eq!(record.paragraphs.len(), 3);
            assert_eq!(report.score, 100);
            assert!(report.is_valid);
        }
        other => panic!("expected done for /port, got {}", other.label()),
    }

    match &outcomes[1] {
        Outcome::Failed {
            error: FetchError::RetriesExhausted { attempts, .. },
        } => assert_eq!(*attempts, 3),
        other => panic!("expected exhausted retries for /down, got {}", other.label()),
    }

    assert!(outcomes[2].is_done(), "expected done for /fruit");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    // A 404 is the origin's answer, not a transient fault
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = ScrapeSession::new(fast_config()).expect("Failed to create session");
    let outcome = session.scrape(&format!("{}/missing", mock_server.uri())).await;

    match outcome {
        Outcome::Failed {
            error: FetchError::Http { status, .. },
        } => assert_eq!(status, 404),
        other => panic!("expected HTTP failure, got {}", other.label()),
    }

    // One attempt, one sample
    assert_eq!(session.metrics_snapshot().samples, 1);
}

#[tokio::test]
async fn test_recovers_after_rate_limit_responses() {
    let mock_server = MockServer::start().await;

    // Two throttled responses, then the real page
    Mock::given(method("GET"))
        .and(path("/turbulent"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/turbulent"))
        .respond_with(html_response(PAGE_HARBOR))
        .mount(&mock_server)
        .await;

    let session = ScrapeSession::new(fast_config()).expect("Failed to create session");
    let outcome = session.scrape(&format!("{}/turbulent", mock_server.uri())).await;

    assert!(outcome.is_done(), "expected recovery on the third attempt");

    let snapshot = session.metrics_snapshot();
    assert_eq!(snapshot.samples, 3);
    let rate = snapshot.success_rate.expect("window should not be empty");
    assert!((rate - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_robots_gate_blocks_disallowed_paths() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // robots.txt is fetched once and cached for the origin
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/open"))
        .respond_with(html_response(PAGE_ORCHARD))
        .mount(&mock_server)
        .await;

    // Should never be called
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html_response(PAGE_HARBOR))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = fast_config();
    config.fetch.respect_robots = true;
    let session = ScrapeSession::new(config).expect("Failed to create session");

    let denied = session.scrape(&format!("{}/admin", base_url)).await;
    match denied {
        Outcome::Failed {
            error: FetchError::RobotsDenied { .. },
        } => {}
        other => panic!("expected robots denial, got {}", other.label()),
    }

    let allowed = session.scrape(&format!("{}/open", base_url)).await;
    assert!(allowed.is_done(), "expected /open to be fetched");

    // The denied URL never reached the fetch stage, so only one sample
    assert_eq!(session.metrics_snapshot().samples, 1);
}

#[tokio::test]
async fn test_duplicate_content_is_demoted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Same body at two paths
    Mock::given(method("GET"))
        .and(path("/one"))
        .respond_with(html_response(PAGE_HARBOR))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/copy"))
        .respond_with(html_response(PAGE_HARBOR))
        .mount(&mock_server)
        .await;

    let session = ScrapeSession::new(fast_config()).expect("Failed to create session");

    let first = session.scrape(&format!("{}/one", base_url)).await;
    match &first {
        Outcome::Done { report, .. } => assert!(report.is_valid),
        other => panic!("expected done for /one, got {}", other.label()),
    }

    let second = session.scrape(&format!("{}/copy", base_url)).await;
    match &second {
        Outcome::Done { report, .. } => {
            assert!(!report.is_valid);
            assert_eq!(report.score, 49);
            assert!(report.issues.contains(&QualityIssue::Duplicate));
        }
        other => panic!("expected done for /copy, got {}", other.label()),
    }
}

#[tokio::test]
async fn test_low_success_rate_alert_fires_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut config = fast_config();
    config.metrics.min_samples = 3;
    let session = ScrapeSession::new(config).expect("Failed to create session");

    let outcome = session.scrape(&format!("{}/down", mock_server.uri())).await;
    assert!(outcome.is_failed());

    // Three failed attempts put the window at 0% success; the crossing is
    // reported once, at critical severity
    let alerts = session.drain_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::LowSuccessRate);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);

    assert!(session.drain_alerts().is_empty());
}

#[tokio::test]
async fn test_unreachable_proxy_is_quarantined() {
    let mock_server = MockServer::start().await;

    // Traffic must go through the (dead) proxy, never straight to the origin
    Mock::given(method("GET"))
        .respond_with(html_response(PAGE_HARBOR))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = fast_config();
    config.proxy.endpoints = vec!["http://127.0.0.1:9".to_string()];
    config.proxy.quarantine_threshold = 2;
    let session = ScrapeSession::new(config).expect("Failed to create session");

    let outcome = session.scrape(&format!("{}/port", mock_server.uri())).await;

    // Two connection failures quarantine the only endpoint; the third
    // attempt then has nowhere to go
    match outcome {
        Outcome::Failed {
            error: FetchError::NoEndpointAvailable,
        } => {}
        other => panic!("expected endpoint exhaustion, got {}", other.label()),
    }

    let snapshot = session.proxy_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].status, EndpointStatus::Quarantined);
    assert_eq!(snapshot[0].quarantine_count, 1);
    assert!((snapshot[0].health_score - 60.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_cancel_prevents_new_requests() {
    let mock_server = MockServer::start().await;

    // Should never be called
    Mock::given(method("GET"))
        .respond_with(html_response(PAGE_HARBOR))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = ScrapeSession::new(fast_config()).expect("Failed to create session");
    session.cancel();

    let urls = vec![
        format!("{}/a", mock_server.uri()),
        format!("{}/b", mock_server.uri()),
    ];
    let outcomes = session.scrape_many(&urls, 2).await;

    assert!(outcomes.iter().all(|o| o.is_cancelled()));
    assert_eq!(session.metrics_snapshot().samples, 0);
}

#[tokio::test]
async fn test_result_document_written_to_disk() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/port"))
        .respond_with(html_response(PAGE_HARBOR))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let session = ScrapeSession::new(fast_config()).expect("Failed to create session");
    let urls = vec![
        format!("{}/port", base_url),
        format!("{}/missing", base_url),
    ];
    let outcomes = session.scrape_many(&urls, 2).await;

    let report = RunReport::from_outcomes(&urls, &outcomes, "cafe1234");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let sink = JsonSink::new(dir.path().join("results.json"));
    sink.persist(&report).await.expect("Failed to persist report");

    let raw = std::fs::read_to_string(sink.path()).expect("Failed to read results file");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("Results are not valid JSON");

    assert_eq!(value["metadata"]["config_hash"], "cafe1234");
    assert_eq!(value["metadata"]["totals"]["urls"], 2);
    assert_eq!(value["metadata"]["totals"]["done"], 1);
    assert_eq!(value["metadata"]["totals"]["failed"], 1);

    assert_eq!(value["results"][0]["outcome"], "done");
    assert_eq!(
        value["results"][0]["record"]["title"],
        "Harbor Logistics Review"
    );
    assert!(value["results"][0]["report"]["is_valid"].as_bool().unwrap());

    assert_eq!(value["results"][1]["outcome"], "failed");
    let error = value["results"][1]["error"].as_str().unwrap();
    assert!(error.contains("404"), "error should name the status: {}", error);
}
