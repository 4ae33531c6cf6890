//! Request coordinator
//!
//! Composes the components for each inbound call: admission, proxy
//! resolution, extraction, metrics. Shared state lives in the components;
//! the coordinator itself only holds handles to them.

use crate::admission::AdmissionController;
use crate::config::Config;
use crate::extraction::{BulkOutcome, EngineSettings, ExtractionEngine, Product, RuleSet};
use crate::metrics::{MetricsAggregator, MetricsSnapshot, PerformanceView};
use crate::pipeline::CallContext;
use crate::proxy::{ProxyRegistry, ProxySpec, ProxyUpdate, ProxyView, ResolvedTransport};
use crate::{ConfigError, Result, ScoutError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct Coordinator {
    admission: Arc<AdmissionController>,
    proxies: Arc<ProxyRegistry>,
    engine: ExtractionEngine,
    metrics: Arc<MetricsAggregator>,
    default_deadline: Option<Duration>,
}

impl Coordinator {
    /// Builds every component from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let metrics = Arc::new(MetricsAggregator::new(&config.metrics));
        let admission = Arc::new(AdmissionController::new(&config.admission));
        let proxies = Arc::new(ProxyRegistry::new(
            ProxySpec::from(&config.default_proxy),
            config.extraction.timeout(),
        ));

        let rules = RuleSet::default()
            .with_overrides(&config.extraction.rules)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        let settings = EngineSettings::try_from(&config.extraction)?;
        let engine = ExtractionEngine::new(rules, settings, Arc::clone(&metrics));

        tracing::info!(
            "Pipeline ready (burst {}, refill {}/min, {:?} sweep)",
            config.admission.burst,
            config.admission.refill_per_minute,
            admission.policy()
        );

        Ok(Self::new(
            admission,
            proxies,
            engine,
            metrics,
            config.extraction.request_deadline(),
        ))
    }

    pub fn new(
        admission: Arc<AdmissionController>,
        proxies: Arc<ProxyRegistry>,
        engine: ExtractionEngine,
        metrics: Arc<MetricsAggregator>,
        default_deadline: Option<Duration>,
    ) -> Self {
        Self {
            admission,
            proxies,
            engine,
            metrics,
            default_deadline,
        }
    }

    /// Starts background upkeep (admission sweeping)
    pub fn spawn_maintenance(&self) -> JoinHandle<()> {
        self.admission.spawn_sweeper()
    }

    /// Scrapes one product page for the caller
    pub async fn scrape(&self, url: &str, ctx: &CallContext) -> Result<Product> {
        let (transport, deadline) = self.prepare(ctx)?;
        Ok(self
            .engine
            .scrape_one(&transport.client, url.trim(), deadline)
            .await?)
    }

    /// Scrapes several product pages sequentially for the caller
    pub async fn bulk_scrape(&self, urls: &[String], ctx: &CallContext) -> Result<BulkOutcome> {
        let (transport, deadline) = self.prepare(ctx)?;
        let urls: Vec<String> = urls.iter().map(|url| url.trim().to_string()).collect();
        Ok(self
            .engine
            .scrape_many(&transport.client, &urls, deadline)
            .await?)
    }

    /// Searches the marketplace listing for the caller
    pub async fn search(&self, query: &str, page: u32, ctx: &CallContext) -> Result<Vec<Product>> {
        let (transport, deadline) = self.prepare(ctx)?;
        Ok(self
            .engine
            .search(&transport.client, query, page, deadline)
            .await?)
    }

    /// Admits the call, then resolves its transport and deadline
    fn prepare(&self, ctx: &CallContext) -> Result<(ResolvedTransport, Option<Instant>)> {
        let key = ctx.admission_key();
        if !self.admission.admit(key) {
            tracing::debug!("Admission denied for {}", key);
            return Err(ScoutError::AdmissionDenied {
                caller: key.to_string(),
            });
        }

        let transport = self.proxies.resolve_transport(&ctx.user);
        match &transport.proxy_id {
            Some(id) => tracing::debug!("{} routed through proxy {}", ctx.user, id),
            None => tracing::debug!("{} routed directly", ctx.user),
        }

        let deadline = ctx
            .deadline
            .or_else(|| self.default_deadline.map(|timeout| Instant::now() + timeout));
        Ok((transport, deadline))
    }

    pub fn create_proxy(&self, spec: ProxySpec, creator: &str) -> Result<ProxyView> {
        Ok(self.proxies.create(spec, creator)?)
    }

    pub fn get_proxy(&self, id: &str) -> Result<ProxyView> {
        Ok(self.proxies.get(id)?)
    }

    pub fn list_proxies(&self) -> Vec<ProxyView> {
        self.proxies.list()
    }

    pub fn update_proxy(&self, id: &str, update: ProxyUpdate) -> Result<ProxyView> {
        Ok(self.proxies.update(id, update)?)
    }

    /// Deletes a proxy; returns how many assignments were removed with it
    pub fn delete_proxy(&self, id: &str) -> Result<usize> {
        Ok(self.proxies.delete(id)?)
    }

    pub fn assign_proxy(&self, user: &str, proxy_id: &str) -> Result<()> {
        Ok(self.proxies.assign(user, proxy_id)?)
    }

    pub fn unassign_proxy(&self, user: &str) -> bool {
        self.proxies.unassign(user)
    }

    pub fn proxy_assignments(&self) -> BTreeMap<String, String> {
        self.proxies.assignments()
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn performance_metrics(&self) -> PerformanceView {
        self.metrics.performance_view()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn proxies(&self) -> &ProxyRegistry {
        &self.proxies
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }
}
