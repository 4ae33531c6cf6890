use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure for Product-Scout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub admission: AdmissionConfig,
    #[serde(rename = "default-proxy")]
    pub default_proxy: DefaultProxyConfig,
    pub extraction: ExtractionConfig,
    pub metrics: MetricsConfig,
}

/// Per-caller token bucket configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Bucket capacity (maximum burst of requests)
    pub burst: u32,

    /// Tokens added back to a bucket per minute
    #[serde(rename = "refill-per-minute")]
    pub refill_per_minute: u32,

    /// How often the sweeper runs (seconds)
    #[serde(rename = "sweep-interval-secs")]
    pub sweep_interval_secs: u64,

    /// What the sweeper does with existing buckets
    #[serde(rename = "sweep-policy")]
    pub sweep_policy: SweepMode,

    /// Idle time after which a bucket is evicted under `idle-eviction` (seconds)
    #[serde(rename = "idle-ttl-secs")]
    pub idle_ttl_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            burst: 10,
            refill_per_minute: 60,
            sweep_interval_secs: 300,
            sweep_policy: SweepMode::FullReset,
            idle_ttl_secs: 600,
        }
    }
}

impl AdmissionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

/// Admission sweeper behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepMode {
    /// Discard every bucket on each sweep
    FullReset,

    /// Discard only buckets that have been idle longer than the TTL
    IdleEviction,
}

/// Credentials of the always-present default proxy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultProxyConfig {
    pub name: String,

    /// Proxy host; empty means the default identity is a direct connection
    pub host: String,

    pub port: u16,

    pub username: String,

    pub password: String,
}

impl Default for DefaultProxyConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            host: String::new(),
            port: 8080,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Fetch and parse configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Marketplace origin used to build search URLs and resolve relative links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Per-request transport timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Pause between sequential bulk fetches (milliseconds)
    #[serde(rename = "bulk-delay-ms")]
    pub bulk_delay_ms: u64,

    /// Maximum number of URLs accepted by one bulk call
    #[serde(rename = "max-bulk-urls")]
    pub max_bulk_urls: usize,

    /// Currency assumed when a price carries no recognizable symbol
    #[serde(rename = "default-currency")]
    pub default_currency: String,

    /// Substitute generic review remarks when a page has none
    #[serde(rename = "placeholder-reviews")]
    pub placeholder_reviews: bool,

    /// Overall deadline applied to each pipeline call (seconds)
    #[serde(rename = "request-deadline-secs")]
    pub request_deadline_secs: Option<u64>,

    /// Per-field selector chains replacing the built-in ones
    pub rules: HashMap<String, Vec<String>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.com".to_string(),
            timeout_secs: 30,
            bulk_delay_ms: 2000,
            max_bulk_urls: 10,
            default_currency: "USD".to_string(),
            placeholder_reviews: false,
            request_deadline_secs: None,
            rules: HashMap::new(),
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn bulk_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_delay_ms)
    }

    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_secs.map(Duration::from_secs)
    }
}

/// Metrics aggregator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Capacity of the most-recently-scraped product id list
    #[serde(rename = "recent-ids")]
    pub recent_ids: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { recent_ids: 10 }
    }
}
