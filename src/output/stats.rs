//! End-of-run summary printed to stdout

use super::traits::RunTotals;
use crate::metrics::{Alert, MetricsSnapshot};
use crate::proxy::EndpointSnapshot;

/// Prints the run summary in a formatted manner
pub fn print_run_summary(
    totals: &RunTotals,
    snapshot: &MetricsSnapshot,
    alerts: &[Alert],
    endpoints: &[EndpointSnapshot],
) {
    println!("=== Scrape Summary ===\n");

    println!("Overview:");
    println!("  URLs:      {}", totals.urls);
    println!("  Done:      {} ({} valid)", totals.done, totals.valid);
    println!("  Failed:    {}", totals.failed);
    println!("  Cancelled: {}", totals.cancelled);
    println!();

    println!("Window Aggregates ({} samples):", snapshot.samples);
    match snapshot.success_rate {
        Some(rate) => println!("  Success rate: {:.1}%", rate * 100.0),
        None => println!("  Success rate: n/a"),
    }
    match snapshot.avg_latency_ms {
        Some(latency) => println!("  Avg latency:  {:.0}ms", latency),
        None => println!("  Avg latency:  n/a"),
    }
    match snapshot.avg_quality_score {
        Some(quality) => println!("  Avg quality:  {:.1}", quality),
        None => println!("  Avg quality:  n/a"),
    }
    println!();

    if !endpoints.is_empty() {
        println!("Proxy Endpoints:");
        for endpoint in endpoints {
            let traffic = match endpoint.avg_response_time_ms {
                Some(ms) => format!("{:.0}ms avg", ms),
                None => "no traffic".to_string(),
            };
            println!(
                "  {} - {} (health {:.0}, {})",
                endpoint.address, endpoint.status, endpoint.health_score, traffic
            );
        }
        println!();
    }

    if !alerts.is_empty() {
        println!("Alerts ({}):", alerts.len());
        for alert in alerts {
            println!("  [{}] {}", alert.severity, alert.message);
        }
        println!();
    }
}
