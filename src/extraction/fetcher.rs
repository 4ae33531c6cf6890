//! HTTP fetching for product and listing pages
//!
//! Requests carry a fixed desktop-browser header set. Failures are reported
//! with stable reasons; raw transport errors only reach the logs.

use crate::{ScrapeError, ScrapeResult};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::future::Future;
use tokio::time::Instant;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Header set sent with every page request
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

/// Fetches a page body
///
/// Anything but `200 OK` is a failure. When `deadline` is set, both the
/// request and the body read are abandoned once it passes.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    deadline: Option<Instant>,
) -> ScrapeResult<String> {
    let request = client.get(url).headers(browser_headers()).send();

    let response = within(deadline, request)
        .await
        .ok_or_else(|| fetch_failed(url, "Deadline exceeded"))?
        .map_err(|e| {
            tracing::debug!("Request to {} failed: {}", url, e);
            fetch_failed(url, classify(&e))
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(fetch_failed(url, &format!("HTTP {}", status.as_u16())));
    }

    within(deadline, response.text())
        .await
        .ok_or_else(|| fetch_failed(url, "Deadline exceeded"))?
        .map_err(|e| {
            tracing::debug!("Reading body of {} failed: {}", url, e);
            fetch_failed(url, "Failed to read response body")
        })
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn classify(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "Request timeout"
    } else if error.is_connect() {
        "Connection failed"
    } else if error.is_redirect() {
        "Too many redirects"
    } else {
        "Request failed"
    }
}

fn fetch_failed(url: &str, reason: &str) -> ScrapeError {
    ScrapeError::FetchFailed {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
