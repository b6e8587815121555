//! Scheduler for managing the crawl frontier and budgets
//!
//! This module handles:
//! - Seeding the frontier from the audited page, known links and sitemaps
//! - Deduplication through compare keys (`visited` and `queued`)
//! - Page-count and depth budgets, including the per-page link budget
//! - Per-fetch timeouts and cooperative cancellation
//! - Following the seed page onto its `www.` or `https` twin when it redirects there
//!
//! Control flow is sequential: one fetch completes before the next dequeue,
//! and only the scheduler mutates its sets.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::crawler::frontier::{Frontier, QueueEntry};
use crate::crawler::record::{PageRecord, PageSource};
use crate::robots::RobotsPolicy;
use crate::url::{
    canonicalize_url, compare_key, path_and_query, path_depth, same_origin, same_site_host,
};
use crate::Diagnostic;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Page and depth limits for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlBudget {
    max_pages: usize,
    max_depth: u32,
}

impl CrawlBudget {
    pub const MIN_PAGES: usize = 5;
    pub const MAX_PAGES: usize = 50;
    pub const DEFAULT_DEPTH: u32 = 5;

    /// Creates a budget, clamping `max_pages` into `MIN_PAGES..=MAX_PAGES`
    pub fn new(max_pages: usize, max_depth: u32) -> Self {
        Self {
            max_pages: max_pages.clamp(Self::MIN_PAGES, Self::MAX_PAGES),
            max_depth,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_pages as usize, config.max_depth)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self::new(20, Self::DEFAULT_DEPTH)
    }
}

/// Number of crawled pages per provenance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    pub sitemap: usize,
    pub seed: usize,
    pub discovered: usize,
}

impl SourceTally {
    pub fn record(&mut self, source: PageSource) {
        match source {
            PageSource::Sitemap => self.sitemap += 1,
            PageSource::Seed => self.seed += 1,
            PageSource::Discovered => self.discovered += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.sitemap + self.seed + self.discovered
    }
}

impl fmt::Display for SourceTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sitemap: {}, seed: {}, discovered: {}",
            self.sitemap, self.seed, self.discovered
        )
    }
}

/// Everything one scheduler run produced
#[derive(Debug, Clone, Default)]
pub struct CrawlRunResult {
    pub pages: Vec<PageRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub source_tally: SourceTally,
    /// Compare keys of every fetched URL
    pub visited: HashSet<String>,
    /// Origin the crawl ended up on, differs from the seed's after a redirect
    pub origin: Option<Url>,
}

/// Optional robots.txt gate applied at enqueue time
#[derive(Debug, Clone)]
struct RobotsGate {
    policy: RobotsPolicy,
    user_agent: String,
}

/// Drives one crawl over a single origin
#[derive(Debug, Clone)]
pub struct Scheduler {
    budget: CrawlBudget,
    seed_link_sample: usize,
    fetch_timeout: Duration,
    robots: Option<RobotsGate>,
    seed_fetch: Option<Result<FetchedPage, FetchError>>,
}

/// Mutable state of a run
struct CrawlState {
    /// Any URL on the origin being crawled
    origin: Url,
    frontier: Frontier,
    visited: HashSet<String>,
    queued: HashSet<String>,
    rejected: HashSet<String>,
    sitemap_keys: HashSet<String>,
    pages: Vec<PageRecord>,
    diagnostics: Vec<Diagnostic>,
    tally: SourceTally,
}

impl Scheduler {
    pub fn new(budget: CrawlBudget, seed_link_sample: usize, fetch_timeout: Duration) -> Self {
        Self {
            budget,
            seed_link_sample,
            fetch_timeout,
            robots: None,
            seed_fetch: None,
        }
    }

    /// Builds a scheduler from the `[crawler]` config section
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            CrawlBudget::from_config(config),
            config.seed_link_sample as usize,
            Duration::from_millis(config.fetch_timeout_ms),
        )
    }

    /// Skips URLs that `policy` disallows for `user_agent`
    pub fn with_robots(mut self, policy: RobotsPolicy, user_agent: impl Into<String>) -> Self {
        self.robots = Some(RobotsGate {
            policy,
            user_agent: user_agent.into(),
        });
        self
    }

    /// Uses `outcome` for the seed page instead of fetching it again
    pub fn with_seed_fetch(mut self, outcome: Result<FetchedPage, FetchError>) -> Self {
        self.seed_fetch = Some(outcome);
        self
    }

    pub fn budget(&self) -> CrawlBudget {
        self.budget
    }

    /// Runs the crawl
    ///
    /// The frontier starts with the seed page, up to `seed_link_sample` known
    /// links (depth 1) and every sitemap URL (depth 0). Pages are fetched until
    /// the frontier empties, the page budget is reached or `cancel` fires.
    ///
    /// When the seed fetch lands on another origin of the same site (`www.`
    /// added or dropped, `http` upgraded to `https`), the crawl continues on
    /// that origin. Known links and sitemap URLs are queued once the seed
    /// has been fetched so they are checked against the origin it landed on.
    pub async fn run(
        &self,
        seed: &Url,
        known_links: &[Url],
        sitemap_urls: &[Url],
        fetcher: &dyn PageFetcher,
        cancel: &CancellationToken,
    ) -> CrawlRunResult {
        let mut state = CrawlState {
            origin: seed.clone(),
            frontier: Frontier::new(),
            visited: HashSet::new(),
            queued: HashSet::new(),
            rejected: HashSet::new(),
            sitemap_keys: sitemap_urls.iter().map(compare_key).collect(),
            pages: Vec::new(),
            diagnostics: Vec::new(),
            tally: SourceTally::default(),
        };

        let mut awaiting_seed = self.enqueue(&mut state, seed, PageSource::Seed, None, 0);
        if !awaiting_seed {
            self.enqueue_initial(&mut state, seed, known_links, sitemap_urls);
        }

        tracing::info!(
            "Starting crawl of {} (max {} pages, depth {}, {} known links, {} sitemap URLs)",
            seed,
            self.budget.max_pages,
            self.budget.max_depth,
            known_links.len(),
            sitemap_urls.len()
        );

        let seed_key = compare_key(seed);
        let mut seed_fetch = self.seed_fetch.clone();

        while state.pages.len() < self.budget.max_pages {
            if cancel.is_cancelled() {
                state.cancelled();
                break;
            }

            let Some(entry) = state.frontier.pop() else {
                break;
            };

            let key = compare_key(&entry.url);
            state.queued.remove(&key);
            if !state.visited.insert(key.clone()) {
                continue;
            }

            let in_sitemap = state.sitemap_keys.contains(&key);
            let is_seed = entry.source == PageSource::Seed && key == seed_key;
            let prefetched = if is_seed { seed_fetch.take() } else { None };

            let outcome = match prefetched {
                Some(result) => Some(result),
                None => {
                    let fetch =
                        tokio::time::timeout(self.fetch_timeout, fetcher.fetch_page(&entry.url));
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        result = fetch => Some(
                            result.unwrap_or_else(|_| Err(FetchError::Timeout(self.fetch_timeout))),
                        ),
                    }
                }
            };

            let record = match outcome {
                None => {
                    state.visited.remove(&key);
                    state.cancelled();
                    break;
                }
                Some(Ok(page)) => PageRecord::fetched(&entry, page, in_sitemap),
                Some(Err(e)) => {
                    state.fetch_failed(&entry.url, e.to_string());
                    PageRecord::failed(&entry, in_sitemap)
                }
            };

            if is_seed && awaiting_seed {
                state.follow_seed_redirect(&record.final_url);
                self.enqueue_initial(&mut state, seed, known_links, sitemap_urls);
                awaiting_seed = false;
            }

            tracing::debug!(
                "Crawled {} [{}] depth {} via {}",
                record.url,
                record.status,
                record.depth,
                record.source
            );

            state.tally.record(entry.source);
            let links = record.internal_links.clone();
            state.pages.push(record);

            let link_budget = self
                .budget
                .max_pages
                .saturating_sub(state.pages.len())
                .saturating_sub(state.frontier.len());
            if link_budget > 0 {
                self.enqueue_links(&mut state, &entry, &links, link_budget);
            }
        }

        tracing::info!(
            "Crawl finished: {} pages ({}), {} diagnostics",
            state.pages.len(),
            state.tally,
            state.diagnostics.len()
        );

        CrawlRunResult {
            pages: state.pages,
            diagnostics: state.diagnostics,
            source_tally: state.tally,
            visited: state.visited,
            origin: Some(state.origin),
        }
    }

    fn enqueue_initial(
        &self,
        state: &mut CrawlState,
        seed: &Url,
        known_links: &[Url],
        sitemap_urls: &[Url],
    ) {
        for link in known_links.iter().take(self.seed_link_sample) {
            self.enqueue(state, link, PageSource::Seed, Some(seed), 1);
        }
        for url in sitemap_urls {
            self.enqueue(state, url, PageSource::Sitemap, None, 0);
        }
    }

    /// Enqueues up to `budget` links found on `parent`, shallowest paths first
    fn enqueue_links(
        &self,
        state: &mut CrawlState,
        parent: &QueueEntry,
        links: &[Url],
        budget: usize,
    ) {
        let depth = parent.depth + 1;
        if depth > self.budget.max_depth {
            return;
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<&Url> = links
            .iter()
            .filter(|link| same_origin(link, &state.origin))
            .filter(|link| {
                let key = compare_key(link);
                !state.visited.contains(&key) && !state.queued.contains(&key) && seen.insert(key)
            })
            .collect();
        candidates.sort_by_key(|link| path_depth(link));

        let mut added = 0;
        for link in candidates {
            if added >= budget {
                break;
            }
            if self.enqueue(state, link, PageSource::Discovered, Some(&parent.url), depth) {
                added += 1;
            }
        }
    }

    /// Adds a URL to the frontier if it passes every filter
    fn enqueue(
        &self,
        state: &mut CrawlState,
        url: &Url,
        source: PageSource,
        discovered_from: Option<&Url>,
        depth: u32,
    ) -> bool {
        let url = match canonicalize_url(url) {
            Ok(url) => url,
            Err(e) => {
                state.diagnostics.push(Diagnostic::InvalidUrl {
                    raw: url.to_string(),
                    reason: e.to_string(),
                });
                return false;
            }
        };

        if !same_origin(&url, &state.origin) || depth > self.budget.max_depth {
            return false;
        }

        let key = compare_key(&url);
        if state.visited.contains(&key)
            || state.queued.contains(&key)
            || state.rejected.contains(&key)
        {
            return false;
        }

        if let Some(gate) = &self.robots {
            if !gate.policy.is_allowed(&gate.user_agent, &path_and_query(&url)) {
                tracing::debug!("robots.txt disallows {}", url);
                state.rejected.insert(key);
                state
                    .diagnostics
                    .push(Diagnostic::RobotsDisallowed { url: url.to_string() });
                return false;
            }
        }

        tracing::debug!("Queued {} ({}, depth {})", url, source, depth);
        state.queued.insert(key);
        state.frontier.push(QueueEntry {
            url,
            source,
            discovered_from: discovered_from.cloned(),
            depth,
        });
        true
    }
}

impl CrawlState {
    /// Moves the crawl onto the seed's landing origin when it is the same site
    fn follow_seed_redirect(&mut self, landed: &Url) {
        if same_origin(landed, &self.origin) || !same_site_host(landed, &self.origin) {
            return;
        }
        tracing::info!(
            "Seed redirected to {}, crawling {} instead of {}",
            landed,
            landed.origin().ascii_serialization(),
            self.origin.origin().ascii_serialization()
        );
        self.origin = landed.clone();
    }

    fn cancelled(&mut self) {
        tracing::warn!("Crawl cancelled after {} pages", self.pages.len());
        self.diagnostics.push(Diagnostic::Cancelled {
            pages: self.pages.len(),
        });
    }

    fn fetch_failed(&mut self, url: &Url, message: String) {
        tracing::warn!("Fetch failed for {}: {}", url, message);
        self.diagnostics.push(Diagnostic::FetchFailure {
            url: url.to_string(),
            message,
        });
    }
}
