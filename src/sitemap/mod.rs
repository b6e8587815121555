//! Sitemap ingestion
//!
//! Pulls candidate page URLs for an origin from `/sitemap.xml`, falling back to
//! the `Sitemap:` lines of robots.txt when the default location yields nothing.
//! Sitemap indexes are followed one level deep. Nothing in here fails the run:
//! every problem becomes a [`Diagnostic::SitemapUnavailable`].

mod parser;

pub use parser::{is_child_sitemap, parse_sitemap, parse_sitemap_locs, SitemapDocument};

use crate::crawler::PageFetcher;
use crate::robots::sitemap_directives;
use crate::url::{canonicalize, compare_key, same_site_host};
use crate::Diagnostic;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Upper bound on sitemap documents fetched per audit
pub const MAX_SITEMAP_DOCUMENTS: usize = 10;

/// URLs collected from an origin's sitemaps
#[derive(Debug, Clone, Default)]
pub struct SitemapIngest {
    /// Canonical page URLs on the audited host, in document order
    pub urls: Vec<Url>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SitemapIngest {
    /// Comparison keys of every ingested URL
    pub fn compare_keys(&self) -> HashSet<String> {
        self.urls.iter().map(compare_key).collect()
    }
}

/// Collects sitemap URLs for the origin of `site`
///
/// # Arguments
///
/// * `site` - Any URL on the audited origin
/// * `robots_text` - The origin's robots.txt body (empty when unavailable)
/// * `fetcher` - Used for every sitemap request
/// * `max_documents` - Cap on documents fetched, child sitemaps included
pub async fn ingest(
    site: &Url,
    robots_text: &str,
    fetcher: &dyn PageFetcher,
    max_documents: usize,
) -> SitemapIngest {
    let mut ingestor = Ingestor::new(site, fetcher, max_documents);

    match site.join("/sitemap.xml") {
        Ok(default) => ingestor.collect(default).await,
        Err(e) => ingestor.diagnostics.push(Diagnostic::SitemapUnavailable {
            url: site.to_string(),
            message: e.to_string(),
        }),
    }

    if ingestor.urls.is_empty() {
        for declared in sitemap_directives(robots_text) {
            match canonicalize(&declared, site) {
                Ok(url) => ingestor.collect(url).await,
                Err(e) => ingestor.diagnostics.push(Diagnostic::SitemapUnavailable {
                    url: declared,
                    message: e.to_string(),
                }),
            }
        }
    }

    tracing::info!(
        "Sitemap ingest for {}: {} URLs from {} documents",
        site.origin().ascii_serialization(),
        ingestor.urls.len(),
        ingestor.documents
    );

    SitemapIngest {
        urls: ingestor.urls,
        diagnostics: ingestor.diagnostics,
    }
}

struct Ingestor<'a> {
    site: &'a Url,
    fetcher: &'a dyn PageFetcher,
    max_documents: usize,
    documents: usize,
    fetched: HashSet<String>,
    seen: HashSet<String>,
    urls: Vec<Url>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Ingestor<'a> {
    fn new(site: &'a Url, fetcher: &'a dyn PageFetcher, max_documents: usize) -> Self {
        Self {
            site,
            fetcher,
            max_documents,
            documents: 0,
            fetched: HashSet::new(),
            seen: HashSet::new(),
            urls: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Reads one sitemap, expanding an index into its child sitemaps
    async fn collect(&mut self, sitemap_url: Url) {
        // (url, may_expand_index)
        let mut queue = VecDeque::from([(sitemap_url, true)]);

        while let Some((url, top_level)) = queue.pop_front() {
            let Some(document) = self.fetch_document(&url).await else {
                continue;
            };

            if document.is_index {
                if !top_level {
                    tracing::debug!("Ignoring nested sitemap index {}", url);
                    continue;
                }
                for loc in document.locs.iter().filter(|loc| is_child_sitemap(loc)) {
                    match canonicalize(loc, &url) {
                        Ok(child) => queue.push_back((child, false)),
                        Err(e) => self.diagnostics.push(Diagnostic::SitemapUnavailable {
                            url: loc.clone(),
                            message: e.to_string(),
                        }),
                    }
                }
            } else {
                self.add_locs(&document.locs);
            }
        }
    }

    async fn fetch_document(&mut self, url: &Url) -> Option<SitemapDocument> {
        if !self.fetched.insert(url.to_string()) {
            return None;
        }
        if self.documents >= self.max_documents {
            tracing::debug!("Sitemap document limit reached, skipping {}", url);
            return None;
        }
        self.documents += 1;

        match self.fetcher.fetch_text(url).await {
            Ok(body) => Some(parse_sitemap(&body)),
            Err(e) => {
                tracing::warn!("Sitemap not available at {}: {}", url, e);
                self.diagnostics.push(Diagnostic::SitemapUnavailable {
                    url: url.to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    fn add_locs(&mut self, locs: &[String]) {
        for loc in locs {
            let url = match canonicalize(loc, self.site) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Skipping sitemap entry '{}': {}", loc, e);
                    continue;
                }
            };
            if !same_site_host(&url, self.site) {
                continue;
            }
            if self.seen.insert(compare_key(&url)) {
                self.urls.push(url);
            }
        }
    }
}
