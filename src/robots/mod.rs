//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, matching and
//! caching robots.txt files, plus the meta-directive checks used to report
//! visibility to AI crawlers.

mod cache;
mod matcher;
mod meta;
mod parser;

pub use cache::{CachedRobots, RobotsCache, RobotsStatus};
pub use matcher::{evaluate, MatchLimits, RobotsEvaluation, RobotsPolicy};
pub use meta::{
    ai_visibility, default_ai_agents, merged_meta_flags, parse_directive_list, parse_meta_flags,
    AiAgent, AiAgentVerdict, BlockReason, MetaDirectives, MetaFlags,
};
pub use parser::{parse_robots, sitemap_directives, RobotsRule, RobotsRuleGroup, RuleKind};

use crate::crawler::{FetchError, PageFetcher};
use url::Url;

/// Fetches the robots.txt text for the origin of `site`
///
/// # Returns
///
/// * `Ok(String)` - The raw robots.txt body
/// * `Err(FetchError)` - Transport failure or a non-2xx status
pub async fn fetch_robots(fetcher: &dyn PageFetcher, site: &Url) -> Result<String, FetchError> {
    let robots_url = site
        .join("/robots.txt")
        .map_err(|e| FetchError::Request(e.to_string()))?;
    fetcher.fetch_text(&robots_url).await
}
