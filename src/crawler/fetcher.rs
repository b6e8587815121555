//! Page fetching
//!
//! The scheduler talks to the network only through [`PageFetcher`]. This module
//! defines that seam and ships [`HttpFetcher`], a reqwest-backed implementation
//! that extracts page fields with the HTML parser in `crawler::parser`.
//!
//! HTTP status codes are data, not errors: a 404 page is returned as a
//! successful fetch with `status = 404`. Only transport problems produce a
//! [`FetchError`].

use crate::config::UserAgentConfig;
use crate::crawler::parser::extract_page;
use crate::robots::{parse_meta_flags, MetaDirectives};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport-level fetch failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// One `<link rel="alternate" hreflang>` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HreflangLink {
    pub lang: String,
    pub href: String,
}

/// Everything the crawl needs to know about one fetched page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Option<Url>,
    pub status: u16,
    pub title: String,
    pub description: String,
    pub description_length: usize,
    pub h1_count: usize,
    /// Text of every H1, space separated
    pub h1_text: String,
    pub word_count: usize,
    /// Absolute canonical URL, empty when the page declares none
    pub canonical: String,
    pub meta: MetaDirectives,
    /// Value of the `X-Robots-Tag` response header
    pub x_robots_tag: String,
    pub noindex: bool,
    pub schema_types: Vec<String>,
    pub hreflang: Vec<HreflangLink>,
    /// Same-origin links found on the page
    pub internal_links: Vec<Url>,
    pub content_length: u64,
    pub content_type: String,
}

/// The page fetcher/extractor collaborator consumed by the scheduler
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches and extracts one page
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Fetches a text resource (robots.txt, sitemap XML)
    ///
    /// Unlike `fetch_page`, a non-2xx status is an error here.
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sitegauge::config::UserAgentConfig;
/// use sitegauge::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiteGauge".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(5)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Timeout the client was built with, reported in [`FetchError::Timeout`]
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Builds a fetcher with its own client
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config, timeout)?, timeout))
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::from(e)
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let content_type = header(CONTENT_TYPE.as_str());
        let x_robots_tag = header("x-robots-tag");
        let declared_length = header(CONTENT_LENGTH.as_str()).parse::<u64>().ok();

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        let content_length = declared_length.unwrap_or(body.len() as u64);

        let extracted = extract_page(&body, &final_url);
        let noindex =
            parse_meta_flags(&extracted.meta.robots).noindex || parse_meta_flags(&x_robots_tag).noindex;

        tracing::debug!(
            "Fetched {} -> {} ({} bytes, {} links)",
            url,
            status,
            content_length,
            extracted.internal_links.len()
        );

        Ok(FetchedPage {
            final_url: Some(final_url),
            status,
            title: extracted.title,
            description: extracted.description,
            description_length: extracted.description_length,
            h1_count: extracted.h1_count,
            h1_text: extracted.h1_text,
            word_count: extracted.word_count,
            canonical: extracted.canonical,
            meta: extracted.meta,
            x_robots_tag,
            noindex,
            schema_types: extracted.schema_types,
            hreflang: extracted.hreflang,
            internal_links: extracted.internal_links,
            content_length,
            content_type,
        })
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().await.map_err(|e| self.request_error(e))
    }
}
