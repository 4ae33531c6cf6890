use crate::ErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time copy of the pipeline counters
///
/// Detached from the live aggregator: mutating the aggregator after taking a
/// snapshot never changes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_scrapes: u64,
    pub failed_scrapes: u64,

    /// Running mean over every recorded outcome, in milliseconds
    pub average_latency_ms: f64,

    pub error_counts: BTreeMap<ErrorKind, u64>,

    /// Most recently scraped product ids, newest first
    pub recent_product_ids: Vec<String>,

    pub last_updated: Option<DateTime<Utc>>,
}

/// Rates derived from a snapshot and the aggregator's uptime
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceView {
    pub uptime_seconds: f64,
    pub requests_per_minute: f64,

    /// Successful share of all requests, 0–100
    pub success_rate: f64,

    pub average_latency_ms: f64,

    /// Share of failures per error kind, 0–100
    pub error_distribution: BTreeMap<ErrorKind, f64>,
}

impl PerformanceView {
    pub fn from_snapshot(snapshot: &MetricsSnapshot, uptime_seconds: f64) -> Self {
        let uptime_minutes = uptime_seconds / 60.0;
        let requests_per_minute = if uptime_minutes > 0.0 {
            snapshot.total_requests as f64 / uptime_minutes
        } else {
            0.0
        };

        let success_rate = if snapshot.total_requests > 0 {
            (snapshot.successful_scrapes as f64 / snapshot.total_requests as f64) * 100.0
        } else {
            0.0
        };

        let error_distribution = if snapshot.failed_scrapes > 0 {
            snapshot
                .error_counts
                .iter()
                .map(|(kind, count)| {
                    (*kind, (*count as f64 / snapshot.failed_scrapes as f64) * 100.0)
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        Self {
            uptime_seconds,
            requests_per_minute,
            success_rate,
            average_latency_ms: snapshot.average_latency_ms,
            error_distribution,
        }
    }
}
