//! Product-Scout: the request pipeline of a product-scraping service
//!
//! Each scrape or search call is admitted (or rejected) under a per-caller
//! token bucket, resolved to an outbound proxy identity, fetched and parsed
//! into structured product data, and recorded in process-wide metrics.

pub mod admission;
pub mod config;
pub mod extraction;
pub mod metrics;
pub mod pipeline;
pub mod proxy;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Product-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Request from {caller} denied by rate limit")]
    AdmissionDenied { caller: String },

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the extraction engine
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("All {} URLs failed: {}", .failures.len(), join_failures(.failures))]
    AllFailed { failures: Vec<UrlFailure> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Proxy registry invariant violations
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Proxy not found: {0}")]
    NotFound(String),

    #[error("Proxy is inactive: {0}")]
    Inactive(String),

    #[error("The default proxy cannot be deleted or deactivated")]
    IsDefault,

    #[error("Invalid proxy: {0}")]
    Invalid(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// A single URL that could not be scraped during a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlFailure {
    pub url: String,
    pub reason: String,
}

impl fmt::Display for UrlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}

fn join_failures(failures: &[UrlFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Stable, caller-facing classification of every error the pipeline reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AdmissionDenied,
    FetchFailed,
    ParseFailed,
    ProxyNotFound,
    ProxyInactive,
    ProxyIsDefault,
    BulkFailure,
    InvalidRequest,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdmissionDenied => "admission_denied",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
            Self::ProxyNotFound => "proxy_not_found",
            Self::ProxyInactive => "proxy_inactive",
            Self::ProxyIsDefault => "proxy_is_default",
            Self::BulkFailure => "bulk_failure",
            Self::InvalidRequest => "invalid_request",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AdmissionDenied { .. } => ErrorKind::AdmissionDenied,
            Self::Scrape(e) => e.kind(),
            Self::Proxy(e) => e.kind(),
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether this is an expected throttling outcome rather than a failure
    pub fn is_admission_denied(&self) -> bool {
        matches!(self, Self::AdmissionDenied { .. })
    }
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FetchFailed { .. } => ErrorKind::FetchFailed,
            Self::AllFailed { .. } => ErrorKind::BulkFailure,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::ProxyNotFound,
            Self::Inactive(_) => ErrorKind::ProxyInactive,
            Self::IsDefault => ErrorKind::ProxyIsDefault,
            Self::Invalid(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Result type alias for Product-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for extraction operations
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for proxy registry operations
pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

// Re-export commonly used types
pub use admission::AdmissionController;
pub use config::Config;
pub use extraction::{BulkOutcome, ExtractionEngine, Price, Product, ReviewSource};
pub use metrics::{MetricsAggregator, MetricsSnapshot, PerformanceView};
pub use pipeline::{CallContext, Coordinator};
pub use proxy::{ProxyRegistry, ProxySpec, ProxyUpdate, ProxyView, DEFAULT_PROXY_ID};
