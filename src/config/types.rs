use serde::Deserialize;

/// Main configuration structure for SiteGauge
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub robots: RobotsConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
    #[serde(rename = "ai-agent", default)]
    pub ai_agents: Vec<AiAgentEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page budget for one run, clamped to 5..=50
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum link depth from the seed page
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// How many already-known links of the audited page are seeded up front
    #[serde(rename = "seed-link-sample", default = "default_seed_link_sample")]
    pub seed_link_sample: u32,

    /// Timeout for every network call (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Skip URLs that robots.txt disallows for our own user agent
    #[serde(rename = "respect-robots", default)]
    pub respect_robots: bool,
}

/// Robots.txt matching limits and caching
///
/// `max-pattern-length` and `regex-size-limit` bound the cost of matching a
/// single rule. They are safety ceilings, not tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotsConfig {
    /// Longest expanded pattern accepted before a rule is skipped
    #[serde(rename = "max-pattern-length", default = "default_max_pattern_length")]
    pub max_pattern_length: usize,

    /// Compiled regex size ceiling in bytes
    #[serde(rename = "regex-size-limit", default = "default_regex_size_limit")]
    pub regex_size_limit: usize,

    /// How long a fetched robots.txt stays valid (seconds)
    #[serde(rename = "cache-ttl-secs", default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            max_pattern_length: default_max_pattern_length(),
            regex_size_limit: default_regex_size_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the token evaluated against robots.txt
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the full User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding runs and snapshots
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// The audited site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// The audited page; its origin bounds the crawl
    pub url: String,

    /// Internal links already known for the audited page
    #[serde(rename = "known-links", default)]
    pub known_links: Vec<String>,
}

/// An AI crawler identity to report visibility for
#[derive(Debug, Clone, Deserialize)]
pub struct AiAgentEntry {
    /// Display name, e.g. "ChatGPT (GPTBot)"
    pub name: String,

    /// Token matched against robots.txt user-agent lines
    pub token: String,
}

fn default_max_pages() -> u32 {
    20
}

fn default_max_depth() -> u32 {
    5
}

fn default_seed_link_sample() -> u32 {
    20
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_max_pattern_length() -> usize {
    500
}

fn default_regex_size_limit() -> usize {
    1 << 20
}

fn default_cache_ttl_secs() -> u64 {
    600
}
