//! Outbound transport construction
//!
//! Builds reqwest clients that route through a proxy entry's endpoint with
//! its credentials. Certificate verification is relaxed on every client,
//! matching the service's historical insecure-by-default behavior.

use crate::proxy::ProxyEntry;
use reqwest::{Client, ClientBuilder, Proxy};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building an outbound client
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Proxy {id} has no usable endpoint: {reason}")]
    InvalidProxy { id: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Produces HTTP clients for a given outbound identity
pub trait TransportFactory: Send + Sync {
    /// Builds a client routed through `proxy`
    fn build(&self, proxy: &ProxyEntry, timeout: Duration) -> Result<Client, TransportError>;

    /// Builds a client with no proxy; never fails
    fn direct(&self, timeout: Duration) -> Client;
}

/// Default factory backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransportFactory;

impl ReqwestTransportFactory {
    pub fn new() -> Self {
        Self
    }

    fn builder(timeout: Duration) -> ClientBuilder {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .brotli(true)
    }

    /// Direct client with only the timeouts set
    fn plain(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build timed client, using defaults: {}", e);
                Client::new()
            })
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn build(&self, proxy: &ProxyEntry, timeout: Duration) -> Result<Client, TransportError> {
        if !proxy.has_endpoint() {
            return Err(TransportError::InvalidProxy {
                id: proxy.id.clone(),
                reason: "host is empty".to_string(),
            });
        }

        let mut route = Proxy::all(proxy.endpoint())?;
        if !proxy.username.is_empty() {
            route = route.basic_auth(&proxy.username, &proxy.password);
        }

        Ok(Self::builder(timeout).proxy(route).build()?)
    }

    fn direct(&self, timeout: Duration) -> Client {
        Self::builder(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build direct client, retrying with plain settings: {}", e);
            Self::plain(timeout)
        })
    }
}
