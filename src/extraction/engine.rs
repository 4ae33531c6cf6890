//! Extraction engine
//!
//! Turns URLs and queries into products through a caller-supplied client.
//! Each fetch attempt is recorded in the metrics aggregator exactly once.

use crate::config::ExtractionConfig;
use crate::extraction::fetcher::fetch_page;
use crate::extraction::product::{parse_product, ParseSettings, Product};
use crate::extraction::rules::RuleSet;
use crate::extraction::search::{build_search_url, parse_search_results};
use crate::metrics::MetricsAggregator;
use crate::{ConfigError, ScrapeError, ScrapeResult, UrlFailure};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const SKIPPED_REASON: &str = "Skipped: deadline exceeded";

/// Engine settings derived from `[extraction]`
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_url: Url,
    pub bulk_delay: Duration,
    pub max_bulk_urls: usize,
    pub parse: ParseSettings,
}

impl TryFrom<&ExtractionConfig> for EngineSettings {
    type Error = ConfigError;

    fn try_from(config: &ExtractionConfig) -> Result<Self, Self::Error> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            base_url,
            bulk_delay: config.bulk_delay(),
            max_bulk_urls: config.max_bulk_urls,
            parse: ParseSettings {
                default_currency: config.default_currency.to_ascii_uppercase(),
                placeholder_reviews: config.placeholder_reviews,
            },
        })
    }
}

/// Result of a bulk scrape with at least one success
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub products: Vec<Product>,
    pub failures: Vec<UrlFailure>,

    /// Set whenever some URLs failed
    pub warning: Option<String>,

    /// The deadline passed before every URL was attempted
    pub stopped_early: bool,
}

pub struct ExtractionEngine {
    rules: RuleSet,
    settings: EngineSettings,
    metrics: Arc<MetricsAggregator>,
}

impl ExtractionEngine {
    pub fn new(rules: RuleSet, settings: EngineSettings, metrics: Arc<MetricsAggregator>) -> Self {
        Self {
            rules,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Fetches and parses one product page
    pub async fn scrape_one(
        &self,
        client: &Client,
        url: &str,
        deadline: Option<Instant>,
    ) -> ScrapeResult<Product> {
        validate_url(url)?;

        let started = Instant::now();
        let body = match fetch_page(client, url, deadline).await {
            Ok(body) => body,
            Err(e) => {
                self.record_failure(&e, started.elapsed());
                return Err(e);
            }
        };

        let product = parse_product(&body, url, &self.rules, &self.settings.parse);
        self.metrics
            .record_outcome(true, started.elapsed(), Some(&product.catalog_id));

        tracing::info!("Scraped {} ({})", url, display_id(&product.catalog_id));
        Ok(product)
    }

    /// Scrapes URLs one after another with a fixed pause between them
    ///
    /// Partial success is a success carrying a warning. If nothing succeeds
    /// the per-URL failures are returned as one aggregate error. Once the
    /// deadline passes, remaining URLs are skipped and reported as failures.
    pub async fn scrape_many(
        &self,
        client: &Client,
        urls: &[String],
        deadline: Option<Instant>,
    ) -> ScrapeResult<BulkOutcome> {
        if urls.is_empty() {
            return Err(ScrapeError::InvalidRequest("No URLs given".to_string()));
        }
        if urls.len() > self.settings.max_bulk_urls {
            return Err(ScrapeError::InvalidRequest(format!(
                "At most {} URLs per bulk request, got {}",
                self.settings.max_bulk_urls,
                urls.len()
            )));
        }

        let mut products = Vec::new();
        let mut failures = Vec::new();
        let mut stopped_early = false;

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.pause(deadline).await {
                stopped_early = true;
            }
            if stopped_early || deadline.is_some_and(|d| Instant::now() >= d) {
                stopped_early = true;
                tracing::warn!("Deadline passed, skipping {} remaining URL(s)", urls.len() - i);
                failures.extend(urls[i..].iter().map(|url| UrlFailure {
                    url: url.clone(),
                    reason: SKIPPED_REASON.to_string(),
                }));
                break;
            }

            match self.scrape_one(client, url, deadline).await {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!("Bulk item failed: {}", e);
                    failures.push(UrlFailure {
                        url: url.clone(),
                        reason: failure_reason(e),
                    });
                }
            }
        }

        if products.is_empty() {
            return Err(ScrapeError::AllFailed { failures });
        }

        let warning = (!failures.is_empty()).then(|| {
            format!(
                "{} of {} URLs failed: {}",
                failures.len(),
                urls.len(),
                failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            )
        });
        if let Some(warning) = &warning {
            tracing::warn!("Partial bulk result: {}", warning);
        }

        Ok(BulkOutcome {
            products,
            failures,
            warning,
            stopped_early,
        })
    }

    /// Fetches one listing page and parses its result cards
    pub async fn search(
        &self,
        client: &Client,
        query: &str,
        page: u32,
        deadline: Option<Instant>,
    ) -> ScrapeResult<Vec<Product>> {
        let url = build_search_url(&self.settings.base_url, query, page)?;

        let started = Instant::now();
        let body = match fetch_page(client, url.as_str(), deadline).await {
            Ok(body) => body,
            Err(e) => {
                self.record_failure(&e, started.elapsed());
                return Err(e);
            }
        };

        let products = parse_search_results(
            &body,
            &self.settings.base_url,
            &self.rules,
            &self.settings.parse,
        );
        self.metrics.record_outcome(true, started.elapsed(), None);

        tracing::info!(
            "Search '{}' page {} returned {} product(s)",
            query.trim(),
            page,
            products.len()
        );
        Ok(products)
    }

    fn record_failure(&self, error: &ScrapeError, latency: Duration) {
        self.metrics.record_outcome(false, latency, None);
        self.metrics.record_error(error.kind());
    }

    /// Sleeps the bulk delay; false when the deadline would pass first
    async fn pause(&self, deadline: Option<Instant>) -> bool {
        let wake = Instant::now() + self.settings.bulk_delay;
        if deadline.is_some_and(|d| wake >= d) {
            return false;
        }
        tokio::time::sleep_until(wake).await;
        true
    }
}

fn validate_url(url: &str) -> ScrapeResult<()> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(ScrapeError::InvalidRequest(format!(
            "Unsupported URL scheme '{}': {}",
            parsed.scheme(),
            url
        ))),
        Err(e) => Err(ScrapeError::InvalidRequest(format!("Invalid URL '{}': {}", url, e))),
    }
}

fn failure_reason(error: ScrapeError) -> String {
    match error {
        ScrapeError::FetchFailed { reason, .. } => reason,
        ScrapeError::InvalidRequest(reason) => reason,
        other => other.to_string(),
    }
}

fn display_id(id: &str) -> &str {
    if id.is_empty() {
        "no catalog id"
    } else {
        id
    }
}
