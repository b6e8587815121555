//! Robots.txt caching implementation
//!
//! Entries are keyed by origin and expire after a configured TTL. The current
//! time comes from an injected [`Clock`] so expiry is testable.

use crate::clock::Clock;
use crate::crawler::PageFetcher;
use crate::robots::matcher::{MatchLimits, RobotsPolicy};
use crate::robots::parser::{parse_robots, sitemap_directives};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// How a cached robots.txt was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsStatus {
    Fetched,
    /// The fetch failed; the site is treated as allow-all
    Unavailable { message: String },
}

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub policy: RobotsPolicy,

    /// Raw robots.txt text, empty when unavailable
    pub text: String,

    pub status: RobotsStatus,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Parses and compiles fetched robots.txt text
    pub fn fetched(text: String, limits: MatchLimits, fetched_at: DateTime<Utc>) -> Self {
        Self {
            policy: RobotsPolicy::new(parse_robots(&text), limits),
            text,
            status: RobotsStatus::Fetched,
            fetched_at,
        }
    }

    /// An allow-all entry recording why robots.txt could not be read
    pub fn unavailable(message: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            policy: RobotsPolicy::allow_all(),
            text: String::new(),
            status: RobotsStatus::Unavailable {
                message: message.into(),
            },
            fetched_at,
        }
    }

    /// Checks if the entry is older than `ttl` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at > ttl
    }

    /// `Sitemap:` URLs declared in the cached text
    pub fn sitemaps(&self) -> Vec<String> {
        sitemap_directives(&self.text)
    }
}

/// Per-origin robots.txt cache
pub struct RobotsCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: HashMap::new(),
        }
    }

    /// Returns a fresh entry for `origin`, if any
    pub fn get(&self, origin: &str) -> Option<&CachedRobots> {
        let now = self.clock.now();
        self.entries
            .get(origin)
            .filter(|entry| !entry.is_stale(now, self.ttl))
    }

    pub fn insert(&mut self, origin: impl Into<String>, entry: CachedRobots) {
        self.entries.insert(origin.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached entry for the origin of `site`, fetching it when
    /// missing or stale
    ///
    /// A failed fetch is cached too, so an unreachable robots.txt is not
    /// requested again until the entry expires.
    pub async fn get_or_fetch(
        &mut self,
        site: &Url,
        fetcher: &dyn PageFetcher,
        limits: MatchLimits,
    ) -> CachedRobots {
        let origin = site.origin().ascii_serialization();
        if let Some(entry) = self.get(&origin) {
            tracing::debug!("robots.txt cache hit for {}", origin);
            return entry.clone();
        }

        let entry = match super::fetch_robots(fetcher, site).await {
            Ok(text) => CachedRobots::fetched(text, limits, self.clock.now()),
            Err(e) => {
                tracing::warn!("robots.txt unavailable for {}: {}", origin, e);
                CachedRobots::unavailable(e.to_string(), self.clock.now())
            }
        };

        self.insert(origin, entry.clone());
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crawler::{FetchError, FetchedPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        body: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn fetch_page(&self, _url: &Url) -> Result<FetchedPage, FetchError> {
            Err(FetchError::Status(404))
        }

        async fn fetch_text(&self, _url: &Url) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone().ok_or(FetchError::Status(404))
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn site() -> Url {
        Url::parse("https://example.com/start").unwrap()
    }

    #[test]
    fn test_entry_staleness() {
        let entry = CachedRobots::fetched(String::new(), MatchLimits::default(), start());
        let ttl = Duration::seconds(600);
        assert!(!entry.is_stale(start() + Duration::seconds(599), ttl));
        assert!(!entry.is_stale(start() + Duration::seconds(600), ttl));
        assert!(entry.is_stale(start() + Duration::seconds(601), ttl));
    }

    #[test]
    fn test_get_honours_ttl() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut cache = RobotsCache::new(Duration::seconds(60), clock.clone());
        cache.insert(
            "https://example.com",
            CachedRobots::fetched(String::new(), MatchLimits::default(), start()),
        );

        assert!(cache.get("https://example.com").is_some());
        clock.advance(Duration::seconds(61));
        assert!(cache.get("https://example.com").is_none());
    }

    #[test]
    fn test_sitemaps_from_cached_text() {
        let entry = CachedRobots::fetched(
            "Sitemap: https://example.com/a.xml".to_string(),
            MatchLimits::default(),
            start(),
        );
        assert_eq!(entry.sitemaps(), vec!["https://example.com/a.xml"]);
    }

    #[tokio::test]
    async fn test_get_or_fetch_uses_cache_until_expiry() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut cache = RobotsCache::new(Duration::seconds(600), clock.clone());
        let fetcher = CountingFetcher {
            body: Some("User-agent: *\nDisallow: /private".to_string()),
            calls: AtomicUsize::new(0),
        };

        let first = cache
            .get_or_fetch(&site(), &fetcher, MatchLimits::default())
            .await;
        assert_eq!(first.status, RobotsStatus::Fetched);
        assert!(!first.policy.is_allowed("SiteGauge", "/private/x"));

        cache
            .get_or_fetch(&site(), &fetcher, MatchLimits::default())
            .await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::seconds(601));
        cache
            .get_or_fetch(&site(), &fetcher, MatchLimits::default())
            .await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_cached_as_allow_all() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut cache = RobotsCache::new(Duration::seconds(600), clock);
        let fetcher = CountingFetcher {
            body: None,
            calls: AtomicUsize::new(0),
        };

        let entry = cache
            .get_or_fetch(&site(), &fetcher, MatchLimits::default())
            .await;
        assert!(matches!(entry.status, RobotsStatus::Unavailable { .. }));
        assert!(entry.policy.is_allowed("AnyBot", "/anything"));

        cache
            .get_or_fetch(&site(), &fetcher, MatchLimits::default())
            .await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
