//! URL handling module for SiteGauge
//!
//! This module provides the two identity forms used across a run:
//! - [`canonicalize`]: the dedup key for crawl entries and page records
//! - [`compare_key`]: a stricter key for sitemap membership and visited checks
//!
//! plus small helpers for path depth and origin comparison.

mod normalize;

pub use normalize::{
    canonicalize, canonicalize_url, compare_key, normalize_host, path_and_query, path_depth,
    same_origin, same_site_host,
};
