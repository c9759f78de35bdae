//! URL discovery for a publication
//!
//! This module resolves the candidate post URLs of a publication from two
//! ranked sources:
//! - `sitemap.xml`, which lists every post
//! - `feed.xml`, which only carries the most recent posts and is used when the
//!   sitemap is unreachable, malformed, or empty
//!
//! Discovery never fails the run: every error is logged and degrades to the
//! next source or to an empty list.

mod feed;
mod sitemap;

pub use feed::parse_feed;
pub use sitemap::parse_sitemap;

use crate::config::DiscoveryConfig;
use crate::url::{filter_excluded, publication_root};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching or parsing a discovery source
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("XML parse error: {0}")]
    Xml(String),
}

/// Result type alias for discovery operations
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Builds the HTTP client used for sitemap and feed requests
///
/// # Arguments
///
/// * `timeout` - Bound on each discovery request
/// * `user_agent` - Optional user agent override
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let user_agent = user_agent
        .map(str::to_string)
        .unwrap_or_else(|| format!("press-harvest/{}", env!("CARGO_PKG_VERSION")));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Resolves the candidate post URLs of a publication
///
/// # Discovery Flow
///
/// 1. GET `{root}/sitemap.xml` and collect every `<loc>`
/// 2. If that fails or yields nothing, GET `{root}/feed.xml` and collect up to
///    `feed-limit` item links
/// 3. Drop URLs whose path contains an exclusion keyword
///
/// # Arguments
///
/// * `client` - HTTP client (its timeout bounds each request)
/// * `root` - Publication root URL
/// * `config` - Discovery configuration
/// * `exclude_keywords` - Keywords that mark non-post pages
///
/// # Returns
///
/// The filtered candidate URLs in source order; empty when both sources fail.
pub async fn discover(
    client: &Client,
    root: &str,
    config: &DiscoveryConfig,
    exclude_keywords: &[String],
) -> Vec<String> {
    let root = publication_root(root);

    let urls = match fetch_sitemap(client, root).await {
        Ok(urls) if !urls.is_empty() => {
            tracing::info!("Found {} URLs in sitemap for {}", urls.len(), root);
            urls
        }
        Ok(_) => {
            tracing::warn!("Sitemap for {} is empty, falling back to feed", root);
            fetch_feed_or_empty(client, root, config.feed_limit).await
        }
        Err(e) => {
            tracing::warn!("Sitemap unavailable for {}: {}, falling back to feed", root, e);
            fetch_feed_or_empty(client, root, config.feed_limit).await
        }
    };

    let total = urls.len();
    let filtered = filter_excluded(urls, exclude_keywords);
    tracing::debug!(
        "Filtered {} discovered URLs to {} post URLs for {}",
        total,
        filtered.len(),
        root
    );
    filtered
}

async fn fetch_feed_or_empty(client: &Client, root: &str, limit: usize) -> Vec<String> {
    tracing::info!(
        "Using feed for {}; only the {} most recent posts are available",
        root,
        limit
    );
    match fetch_feed(client, root, limit).await {
        Ok(urls) => {
            tracing::info!("Found {} URLs in feed for {}", urls.len(), root);
            urls
        }
        Err(e) => {
            tracing::error!("Feed unavailable for {}: {}", root, e);
            Vec::new()
        }
    }
}

async fn fetch_sitemap(client: &Client, root: &str) -> DiscoveryResult<Vec<String>> {
    let body = fetch_text(client, &format!("{}/sitemap.xml", root)).await?;
    parse_sitemap(&body)
}

async fn fetch_feed(client: &Client, root: &str, limit: usize) -> DiscoveryResult<Vec<String>> {
    let body = fetch_text(client, &format!("{}/feed.xml", root)).await?;
    parse_feed(&body, limit)
}

async fn fetch_text(client: &Client, url: &str) -> DiscoveryResult<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
