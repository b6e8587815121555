//! Per-page crawl records

use crate::crawler::fetcher::{FetchedPage, HreflangLink};
use crate::crawler::frontier::QueueEntry;
use crate::robots::MetaDirectives;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How a URL entered the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Seed,
    Sitemap,
    Discovered,
}

impl PageSource {
    /// Dequeue rank, lower is fetched first
    pub fn rank(self) -> u8 {
        match self {
            PageSource::Seed => 0,
            PageSource::Sitemap => 1,
            PageSource::Discovered => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSource::Seed => "seed",
            PageSource::Sitemap => "sitemap",
            PageSource::Discovered => "discovered",
        }
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch outcome of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// An HTTP response was received
    Code(u16),
    /// Transport failure or timeout
    Err,
}

impl PageStatus {
    pub fn code(self) -> Option<u16> {
        match self {
            PageStatus::Code(code) => Some(code),
            PageStatus::Err => None,
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, PageStatus::Code(200..=299))
    }

    pub fn is_redirect(self) -> bool {
        matches!(self, PageStatus::Code(300..=399))
    }

    /// Transport failure or a 4xx/5xx response
    pub fn is_error(self) -> bool {
        match self {
            PageStatus::Code(code) => code >= 400,
            PageStatus::Err => true,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Code(code) => write!(f, "{}", code),
            PageStatus::Err => f.write_str("ERR"),
        }
    }
}

/// The observed facts about one crawled URL
///
/// One record is created per dequeued entry and never mutated afterwards.
/// `url` is the canonical URL that was scheduled; `final_url` is where the
/// fetch ended up after redirects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub url: Url,
    pub final_url: Url,
    pub status: PageStatus,
    pub title: String,
    pub description: String,
    pub description_length: usize,
    pub h1_count: usize,
    pub h1_text: String,
    pub word_count: usize,
    pub canonical: String,
    pub meta_robots: String,
    pub googlebot_meta: String,
    pub bingbot_meta: String,
    pub noindex: bool,
    pub schema_types: Vec<String>,
    pub hreflang: Vec<HreflangLink>,
    pub internal_links: Vec<Url>,
    pub depth: u32,
    pub source: PageSource,
    pub discovered_from: Option<Url>,
    pub in_sitemap: bool,
    pub content_length: u64,
    pub content_type: String,
}

impl PageRecord {
    /// Builds the record for a successful fetch
    pub fn fetched(entry: &QueueEntry, page: FetchedPage, in_sitemap: bool) -> Self {
        Self {
            url: entry.url.clone(),
            final_url: page.final_url.unwrap_or_else(|| entry.url.clone()),
            status: PageStatus::Code(page.status),
            title: page.title,
            description: page.description,
            description_length: page.description_length,
            h1_count: page.h1_count,
            h1_text: page.h1_text,
            word_count: page.word_count,
            canonical: page.canonical,
            meta_robots: page.meta.robots,
            googlebot_meta: page.meta.googlebot,
            bingbot_meta: page.meta.bingbot,
            noindex: page.noindex,
            schema_types: page.schema_types,
            hreflang: page.hreflang,
            internal_links: page.internal_links,
            depth: entry.depth,
            source: entry.source,
            discovered_from: entry.discovered_from.clone(),
            in_sitemap,
            content_length: page.content_length,
            content_type: page.content_type,
        }
    }

    /// Builds the record for a failed fetch
    pub fn failed(entry: &QueueEntry, in_sitemap: bool) -> Self {
        Self {
            url: entry.url.clone(),
            final_url: entry.url.clone(),
            status: PageStatus::Err,
            title: String::new(),
            description: String::new(),
            description_length: 0,
            h1_count: 0,
            h1_text: String::new(),
            word_count: 0,
            canonical: String::new(),
            meta_robots: String::new(),
            googlebot_meta: String::new(),
            bingbot_meta: String::new(),
            noindex: false,
            schema_types: Vec::new(),
            hreflang: Vec::new(),
            internal_links: Vec::new(),
            depth: entry.depth,
            source: entry.source,
            discovered_from: entry.discovered_from.clone(),
            in_sitemap,
            content_length: 0,
            content_type: String::new(),
        }
    }

    /// The three crawler meta tags as read from the page
    pub fn meta_directives(&self) -> MetaDirectives {
        MetaDirectives {
            robots: self.meta_robots.clone(),
            googlebot: self.googlebot_meta.clone(),
            bingbot: self.bingbot_meta.clone(),
        }
    }
}
