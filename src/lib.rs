//! SiteGauge: a crawlability and content-structure auditor
//!
//! This crate crawls a single site under a strict page budget, evaluates
//! robots.txt and meta directives per crawler identity, and groups the crawled
//! pages into templates so site-wide defects stand out from page-level noise.

pub mod clock;
pub mod cluster;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod sitemap;
pub mod storage;
pub mod url;

use serde::Serialize;
use thiserror::Error;

/// Main error type for SiteGauge operations
///
/// These are setup failures only. Anything that goes wrong inside a crawl run
/// is recorded as a [`Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum SiteGaugeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Invalid URL '{raw}': {reason}")]
    InvalidUrl { raw: String, reason: String },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// A non-fatal problem recorded during a run
///
/// Diagnostics are collected alongside the results and never abort the crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("Invalid URL '{raw}': {reason}")]
    InvalidUrl { raw: String, reason: String },

    #[error("Fetch failed for {url}: {message}")]
    FetchFailure { url: String, message: String },

    #[error("Skipped robots.txt pattern '{pattern}': {reason}")]
    MalformedRobotsPattern { pattern: String, reason: String },

    #[error("Sitemap not available at {url}: {message}")]
    SitemapUnavailable { url: String, message: String },

    #[error("robots.txt not available for {origin}: {message}")]
    RobotsUnavailable { origin: String, message: String },

    #[error("Snapshot history unavailable: {message}")]
    SnapshotUnavailable { message: String },

    #[error("Skipped {url}: disallowed by robots.txt")]
    RobotsDisallowed { url: String },

    #[error("Crawl cancelled after {pages} pages")]
    Cancelled { pages: usize },
}

/// Result type alias for SiteGauge operations
pub type Result<T> = std::result::Result<T, SiteGaugeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_audit, Coordinator, CrawlBudget, PageRecord, PageSource, PageStatus};
pub use output::{AuditReport, CrawlSummary};
pub use url::{canonicalize, compare_key};
