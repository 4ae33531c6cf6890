use crate::config::MetricsConfig;
use crate::metrics::{MetricsSnapshot, PerformanceView};
use crate::ErrorKind;
use chrono::Utc;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Process-wide scrape counters
///
/// Fed once per extraction attempt. All counters live behind one
/// reader/writer lock; reads hand back detached copies.
pub struct MetricsAggregator {
    state: RwLock<MetricsSnapshot>,
    started: Instant,
    recent_capacity: usize,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl MetricsAggregator {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            state: RwLock::new(MetricsSnapshot::default()),
            started: Instant::now(),
            recent_capacity: config.recent_ids.max(1),
        }
    }

    /// Records the outcome of one extraction attempt
    ///
    /// Must be called exactly once per attempt, successful or not, for the
    /// running latency mean to stay exact.
    pub fn record_outcome(&self, success: bool, latency: Duration, product_id: Option<&str>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        state.total_requests += 1;
        if success {
            state.successful_scrapes += 1;
        } else {
            state.failed_scrapes += 1;
        }

        let n = state.total_requests as f64;
        let sample = latency.as_secs_f64() * 1000.0;
        state.average_latency_ms = (state.average_latency_ms * (n - 1.0) + sample) / n;

        if success {
            if let Some(id) = product_id.filter(|id| !id.is_empty()) {
                let recent = &mut state.recent_product_ids;
                recent.retain(|existing| existing != id);
                recent.insert(0, id.to_string());
                recent.truncate(self.recent_capacity);
            }
        }

        state.last_updated = Some(Utc::now());
    }

    /// Counts one failure of the given kind
    pub fn record_error(&self, kind: ErrorKind) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state.error_counts.entry(kind).or_insert(0) += 1;
        state.last_updated = Some(Utc::now());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn performance_view(&self) -> PerformanceView {
        PerformanceView::from_snapshot(&self.snapshot(), self.uptime().as_secs_f64())
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Clears every counter; uptime keeps running from process start
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = MetricsSnapshot::default();
        tracing::info!("Metrics reset");
    }
}
