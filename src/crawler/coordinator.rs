//! Audit coordinator - main orchestration logic
//!
//! This module ties one audit run together:
//! - Resolving the seed page and its origin, following a redirect onto the
//!   site's `www.` or `https` twin
//! - Reading robots.txt (through the cache) and sitemaps
//! - Running the scheduler under the page budget
//! - Aggregating results and clustering templates
//! - Recording the run and the cluster snapshot in storage (completed runs only)

use crate::clock::{Clock, SystemClock};
use crate::cluster::{alerts, cluster, diff, snapshot, Cluster, ClusterDelta};
use crate::config::Config;
use crate::crawler::fetcher::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
use crate::crawler::record::PageRecord;
use crate::crawler::scheduler::{CrawlRunResult, Scheduler};
use crate::output::{
    blocker_stats, cannibalization, content_stats, depth_distribution, duplicate_descriptions,
    duplicate_titles, hreflang_issues, inbound_links, indexability_breakdown, intent_mix,
    orphan_candidates, path_map, sitemap_stats, summarize, AuditReport,
};
use crate::robots::{
    ai_visibility, default_ai_agents, AiAgent, AiAgentVerdict, CachedRobots, MatchLimits,
    RobotsCache, RobotsStatus,
};
use crate::sitemap::{ingest, MAX_SITEMAP_DOCUMENTS};
use crate::storage::{open_storage, RunStatus, SnapshotStore};
use crate::url::{canonicalize, canonicalize_url, compare_key, path_and_query, same_site_host};
use crate::{Diagnostic, SiteGaugeError, UrlError};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main audit coordinator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    fetcher: Arc<dyn PageFetcher>,
    store: Box<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    robots_cache: RobotsCache,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The audit configuration
    /// * `fetcher` - Fetcher used for pages, robots.txt and sitemaps
    /// * `store` - Where runs and cluster snapshots are kept
    /// * `clock` - Time source for timestamps and robots cache expiry
    pub fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        store: Box<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = chrono::Duration::seconds(config.robots.cache_ttl_secs as i64);
        let robots_cache = RobotsCache::new(ttl, Arc::clone(&clock));

        Self {
            config,
            config_hash: String::new(),
            fetcher,
            store,
            clock,
            robots_cache,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` instead of the coordinator's own token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Records `hash` as the config hash of every run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Token that stops the current run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The stored snapshot backend
    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    /// Runs one audit of the configured site
    ///
    /// Only an invalid seed URL fails the run. Every other problem is recorded
    /// in the report's diagnostics.
    pub async fn run(&mut self) -> Result<AuditReport, SiteGaugeError> {
        let started_at = self.clock.now();
        let configured = parse_seed(&self.config.site.url)?;
        let mut diagnostics = Vec::new();

        tracing::info!("Starting audit of {}", configured);

        let (seed, seed_fetch) = self.resolve_seed(configured).await;
        let origin = seed.origin().ascii_serialization();

        // Robots.txt
        let limits = MatchLimits::from(self.config.robots.clone());
        let robots = self
            .robots_cache
            .get_or_fetch(&seed, self.fetcher.as_ref(), limits)
            .await;
        if let RobotsStatus::Unavailable { message } = &robots.status {
            diagnostics.push(Diagnostic::RobotsUnavailable {
                origin: origin.clone(),
                message: message.clone(),
            });
        }
        diagnostics.extend(robots.policy.diagnostics().iter().cloned());

        // Sitemaps
        let sitemap = ingest(
            &seed,
            &robots.text,
            self.fetcher.as_ref(),
            MAX_SITEMAP_DOCUMENTS,
        )
        .await;
        diagnostics.extend(sitemap.diagnostics.iter().cloned());

        let known_links = self.known_links(&seed, &mut diagnostics);

        // Crawl
        let run_id = match self
            .store
            .start_run(&origin, &self.config_hash, started_at)
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Could not record run start: {}", e);
                diagnostics.push(Diagnostic::SnapshotUnavailable {
                    message: e.to_string(),
                });
                None
            }
        };

        let mut scheduler = Scheduler::from_config(&self.config.crawler);
        if let Some(outcome) = seed_fetch {
            scheduler = scheduler.with_seed_fetch(outcome);
        }
        if self.config.crawler.respect_robots {
            scheduler = scheduler.with_robots(
                robots.policy.clone(),
                self.config.user_agent.crawler_name.clone(),
            );
        }
        let budget = scheduler.budget();

        let CrawlRunResult {
            pages,
            diagnostics: crawl_diagnostics,
            source_tally,
            ..
        } = scheduler
            .run(
                &seed,
                &known_links,
                &sitemap.urls,
                self.fetcher.as_ref(),
                &self.cancel,
            )
            .await;
        diagnostics.extend(crawl_diagnostics);

        let cancelled = diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Cancelled { .. }));

        // Aggregate
        let summary = summarize(&pages);
        let inbound = inbound_links(&pages);
        let orphans = orphan_candidates(&pages, &inbound);
        let sitemap_stats = sitemap_stats(&pages, &inbound);

        // Templates
        let clusters = cluster(&pages);
        let alerts = alerts(&clusters);
        let finished_at = self.clock.now();

        let cluster_deltas = if cancelled {
            tracing::info!("Run was cancelled, not storing a cluster snapshot");
            Vec::new()
        } else {
            self.record_snapshot(&origin, &clusters, finished_at, &mut diagnostics)
        };

        if let Some(run_id) = run_id {
            let status = if cancelled {
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            };
            if let Err(e) = self
                .store
                .finish_run(run_id, status, pages.len(), finished_at)
            {
                tracing::warn!("Could not record run end: {}", e);
                diagnostics.push(Diagnostic::SnapshotUnavailable {
                    message: e.to_string(),
                });
            }
        }

        let ai_visibility = self.seed_visibility(&seed, &pages, &robots);

        tracing::info!(
            "Audit of {} finished: {} pages, {} clusters, {} alerts, {} diagnostics",
            origin,
            pages.len(),
            clusters.len(),
            alerts.len(),
            diagnostics.len()
        );

        Ok(AuditReport {
            origin,
            started_at,
            finished_at,
            budget,
            indexability: indexability_breakdown(&pages),
            depth_distribution: depth_distribution(&pages, budget.max_depth()),
            duplicate_titles: duplicate_titles(&pages),
            duplicate_descriptions: duplicate_descriptions(&pages),
            hreflang_issues: hreflang_issues(&pages),
            path_map: path_map(&pages),
            content_stats: content_stats(&pages),
            blocker_stats: blocker_stats(&pages),
            intent_mix: intent_mix(&pages),
            cannibalization: cannibalization(&pages),
            summary,
            inbound,
            orphan_candidates: orphans,
            clusters,
            alerts,
            cluster_deltas,
            ai_visibility,
            sitemap_stats,
            source_tally,
            diagnostics,
            pages,
        })
    }

    /// Fetches the configured seed once
    ///
    /// When the fetch lands on another origin of the same site, that landing
    /// URL becomes the seed. The outcome is handed to the scheduler so the
    /// seed is not fetched twice. Nothing is fetched when the run is already
    /// cancelled or robots.txt keeps the crawler off the seed.
    async fn resolve_seed(
        &mut self,
        configured: Url,
    ) -> (Url, Option<Result<FetchedPage, FetchError>>) {
        if self.cancel.is_cancelled() {
            return (configured, None);
        }

        if self.config.crawler.respect_robots {
            let limits = MatchLimits::from(self.config.robots.clone());
            let robots = self
                .robots_cache
                .get_or_fetch(&configured, self.fetcher.as_ref(), limits)
                .await;
            let agent = &self.config.user_agent.crawler_name;
            if !robots.policy.is_allowed(agent, &path_and_query(&configured)) {
                return (configured, None);
            }
        }

        let timeout = Duration::from_millis(self.config.crawler.fetch_timeout_ms);
        let fetch = tokio::time::timeout(timeout, self.fetcher.fetch_page(&configured));
        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = fetch => Some(result.unwrap_or_else(|_| Err(FetchError::Timeout(timeout)))),
        };
        let Some(outcome) = outcome else {
            return (configured, None);
        };

        let landed = outcome
            .as_ref()
            .ok()
            .and_then(|page| page.final_url.as_ref())
            .and_then(|url| canonicalize_url(url).ok())
            .filter(|url| url.origin() != configured.origin() && same_site_host(url, &configured));

        match landed {
            Some(url) => {
                tracing::info!("{} redirects to {}, auditing that origin", configured, url);
                (url, Some(outcome))
            }
            None => (configured, Some(outcome)),
        }
    }

    /// Appends this run's snapshot and diffs it against the previous one
    fn record_snapshot(
        &mut self,
        origin: &str,
        clusters: &[Cluster],
        taken_at: DateTime<Utc>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<ClusterDelta> {
        if let Err(e) = self
            .store
            .append_snapshot(origin, &snapshot(clusters, taken_at))
        {
            tracing::warn!("Could not store cluster snapshot: {}", e);
            diagnostics.push(Diagnostic::SnapshotUnavailable {
                message: e.to_string(),
            });
        }

        match self.store.load_history(origin) {
            Ok(history) => diff(&history),
            Err(e) => {
                tracing::warn!("Could not load snapshot history: {}", e);
                diagnostics.push(Diagnostic::SnapshotUnavailable {
                    message: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    /// Canonicalizes the configured known links against the seed
    fn known_links(&self, seed: &Url, diagnostics: &mut Vec<Diagnostic>) -> Vec<Url> {
        self.config
            .site
            .known_links
            .iter()
            .filter_map(|raw| match canonicalize(raw, seed) {
                Ok(url) => Some(url),
                Err(e) => {
                    diagnostics.push(Diagnostic::InvalidUrl {
                        raw: raw.clone(),
                        reason: e.to_string(),
                    });
                    None
                }
            })
            .collect()
    }

    /// AI agent visibility of the seed page
    ///
    /// Meta directives come from the seed's record when it was crawled.
    fn seed_visibility(
        &self,
        seed: &Url,
        pages: &[PageRecord],
        robots: &CachedRobots,
    ) -> Vec<AiAgentVerdict> {
        let agents: Vec<AiAgent> = if self.config.ai_agents.is_empty() {
            default_ai_agents()
        } else {
            self.config
                .ai_agents
                .iter()
                .map(|entry| AiAgent::new(&entry.name, &entry.token))
                .collect()
        };

        let seed_key = compare_key(seed);
        let meta = pages
            .iter()
            .find(|page| compare_key(&page.url) == seed_key)
            .map(PageRecord::meta_directives)
            .unwrap_or_default();

        ai_visibility(&robots.policy, &meta, &agents, &path_and_query(seed))
    }
}

fn parse_seed(raw: &str) -> Result<Url, SiteGaugeError> {
    let base = Url::parse(raw.trim()).map_err(|e| UrlError::InvalidUrl {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(canonicalize(base.as_str(), &base)?)
}

/// Runs a complete audit with the bundled HTTP fetcher and SQLite storage
///
/// # Arguments
///
/// * `config` - The audit configuration
/// * `config_hash` - Hash of the config file, stored with the run
///
/// # Example
///
/// ```no_run
/// use sitegauge::config::load_config_with_hash;
/// use sitegauge::crawler::run_audit;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("sitegauge.toml"))?;
/// let report = run_audit(config, hash).await?;
/// println!("{} pages crawled", report.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_audit(config: Config, config_hash: String) -> Result<AuditReport, SiteGaugeError> {
    let timeout = Duration::from_millis(config.crawler.fetch_timeout_ms);
    let fetcher = HttpFetcher::from_config(&config.user_agent, timeout)?;
    let store = open_storage(Path::new(&config.output.database_path))?;

    let mut coordinator = Coordinator::new(
        config,
        Arc::new(fetcher),
        Box::new(store),
        Arc::new(SystemClock),
    )
    .with_config_hash(config_hash);

    coordinator.run().await
}
