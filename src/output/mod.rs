//! Output module for generating audit reports
//!
//! This module handles:
//! - Aggregating page records into summary statistics
//! - Classifying pages by search intent
//! - The [`AuditReport`] produced by every run
//! - Generating markdown summaries and console output

pub mod aggregate;
pub mod intent;
mod markdown;
pub mod stats;

pub use aggregate::{
    blocker_stats, content_stats, depth_distribution, duplicate_descriptions, duplicate_titles,
    hreflang_issues, inbound_links, indexability_breakdown, indexability_reasons, is_indexable,
    orphan_candidates, path_map, sitemap_stats, summarize, BlockerStats, ContentStats,
    CrawlSummary, DepthBucket, DuplicateGroup, HreflangIssue, IndexabilityCount,
    IndexabilityReason, PathSection, SitemapStats,
};
pub use intent::{
    cannibalization, classify_intent, intent_mix, CannibalizationGroup, IntentCount, SearchIntent,
};
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{print_history, print_report};

use crate::cluster::{Cluster, ClusterDelta};
use crate::crawler::{CrawlBudget, PageRecord, SourceTally};
use crate::robots::AiAgentVerdict;
use crate::Diagnostic;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything one audit run found
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub origin: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub budget: CrawlBudget,
    pub pages: Vec<PageRecord>,
    pub summary: CrawlSummary,
    pub indexability: Vec<IndexabilityCount>,
    pub inbound: BTreeMap<String, usize>,
    pub orphan_candidates: Vec<String>,
    pub clusters: Vec<Cluster>,
    pub alerts: Vec<String>,
    pub cluster_deltas: Vec<ClusterDelta>,
    pub ai_visibility: Vec<AiAgentVerdict>,
    pub sitemap_stats: SitemapStats,
    pub depth_distribution: Vec<DepthBucket>,
    pub duplicate_titles: Vec<DuplicateGroup>,
    pub duplicate_descriptions: Vec<DuplicateGroup>,
    pub hreflang_issues: Vec<HreflangIssue>,
    pub path_map: Vec<PathSection>,
    pub content_stats: ContentStats,
    pub blocker_stats: BlockerStats,
    pub intent_mix: Vec<IntentCount>,
    pub cannibalization: Vec<CannibalizationGroup>,
    pub source_tally: SourceTally,
    pub diagnostics: Vec<Diagnostic>,
}

impl AuditReport {
    /// Run duration in whole seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// True when the run was cut short by cancellation
    pub fn was_cancelled(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Cancelled { .. }))
    }
}
