//! Human-readable metrics report

use crate::metrics::{MetricsSnapshot, PerformanceView};

/// Prints a snapshot and its derived rates to stdout
pub fn print_report(snapshot: &MetricsSnapshot, view: &PerformanceView) {
    println!("=== Scrape Metrics ===\n");

    println!("Overview:");
    println!("  Uptime: {:.1}s", view.uptime_seconds);
    println!("  Total requests: {}", snapshot.total_requests);
    println!("  Successful scrapes: {}", snapshot.successful_scrapes);
    println!("  Failed scrapes: {}", snapshot.failed_scrapes);
    println!("  Success rate: {:.1}%", view.success_rate);
    println!("  Requests per minute: {:.2}", view.requests_per_minute);
    println!("  Average latency: {:.1} ms", snapshot.average_latency_ms);
    println!();

    if !snapshot.error_counts.is_empty() {
        println!("Error Summary:");
        // Most frequent first
        let mut error_counts: Vec<_> = snapshot.error_counts.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            let share = view.error_distribution.get(kind).copied().unwrap_or(0.0);
            println!("  {}: {} ({:.1}%)", kind, count, share);
        }
        println!();
    }

    if !snapshot.recent_product_ids.is_empty() {
        println!(
            "Recent Products ({}):",
            snapshot.recent_product_ids.len()
        );
        for id in &snapshot.recent_product_ids {
            println!("  - {}", id);
        }
        println!();
    }

    if let Some(updated) = snapshot.last_updated {
        println!("Last updated: {}", updated.to_rfc3339());
    }
}
