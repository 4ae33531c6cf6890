//! Pipeline metrics
//!
//! Counts extraction outcomes, error kinds and latency across the whole
//! process, and derives throughput and success rates on demand.

mod aggregator;
mod report;
mod snapshot;

pub use aggregator::MetricsAggregator;
pub use report::print_report;
pub use snapshot::{MetricsSnapshot, PerformanceView};
