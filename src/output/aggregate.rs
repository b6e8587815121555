//! Crawl result aggregation
//!
//! Pure functions over the page records of one run: summary counters,
//! indexability classification, the inbound-link index and the breakdowns
//! shown in the report (sections, content and blocker counts, duplicates).

use crate::crawler::PageRecord;
use crate::url::canonicalize_url;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use url::Url;

/// Samples kept in list-style statistics
const SAMPLE_LIMIT: usize = 10;

/// Pages with fewer words than this (but more than zero) count as thin
const THIN_WORD_LIMIT: usize = 300;

/// Sections kept in the path map
const PATH_MAP_LIMIT: usize = 8;

/// Pages kept as blocker samples
const BLOCKER_SAMPLE_LIMIT: usize = 12;

fn is_thin(page: &PageRecord) -> bool {
    page.word_count > 0 && page.word_count < THIN_WORD_LIMIT
}

/// Counters over one crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub total_pages: usize,
    pub ok_pages: usize,
    pub error_pages: usize,
    pub redirects: usize,
    pub noindex_pages: usize,
    pub missing_canonical: usize,
    pub off_origin_canonical: usize,
    pub non_self_canonical: usize,
    pub missing_descriptions: usize,
    pub missing_h1: usize,
    pub multiple_h1: usize,
    pub thin_pages: usize,
    pub hreflang_missing_back: usize,
    pub indexable: usize,
    /// Mean crawl depth rounded to one decimal
    pub avg_depth: f64,
    pub max_depth: u32,
}

impl CrawlSummary {
    /// Percentage of crawled pages that are indexable
    pub fn indexable_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            (self.indexable as f64 / self.total_pages as f64) * 100.0
        }
    }
}

/// Why a page is not indexable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IndexabilityReason {
    StatusError,
    Redirect,
    Noindex,
    MissingCanonical,
    CanonicalToOther,
    NotInSitemap,
}

impl IndexabilityReason {
    pub fn label(self) -> &'static str {
        match self {
            IndexabilityReason::StatusError => "Status error",
            IndexabilityReason::Redirect => "Redirect",
            IndexabilityReason::Noindex => "Noindex",
            IndexabilityReason::MissingCanonical => "Missing canonical",
            IndexabilityReason::CanonicalToOther => "Canonical to other",
            IndexabilityReason::NotInSitemap => "Not in sitemap",
        }
    }
}

impl fmt::Display for IndexabilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label used for pages with no indexability problem
pub const INDEXABLE_LABEL: &str = "Indexable";

/// Pages per indexability reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexabilityCount {
    pub reason: String,
    pub count: usize,
}

/// In/out of sitemap breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SitemapStats {
    pub in_sitemap: usize,
    pub not_in_sitemap: usize,
    pub orphan_candidates: Vec<String>,
    pub not_in_sitemap_samples: Vec<String>,
}

/// Pages crawled at one depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepthBucket {
    pub depth: u32,
    pub count: usize,
}

/// Pages sharing one (case-folded) value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub value: String,
    pub urls: Vec<String>,
}

/// Pages and defects under one top-level path segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSection {
    /// `/` for the root, otherwise `/segment/`
    pub segment: String,
    pub count: usize,
    pub missing_description: usize,
    pub missing_h1: usize,
    pub thin: usize,
}

/// On-page content counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentStats {
    pub missing_title: usize,
    pub missing_description: usize,
    pub missing_h1: usize,
    pub thin: usize,
    /// Mean word count rounded to a whole number
    pub avg_words: usize,
}

/// Counters for everything that keeps a page out of the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockerStats {
    pub redirects: usize,
    pub errors: usize,
    pub noindex: usize,
    pub canonical_missing: usize,
    pub canonical_other: usize,
    /// URLs that are noindex, answered 3xx or above, or lack a canonical
    pub samples: Vec<String>,
}

/// An hreflang alternate whose target does not link back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HreflangIssue {
    pub source: String,
    pub target: String,
    pub lang: String,
}

/// Canonical string form of a raw URL, `None` if it does not parse
fn normalized(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    canonicalize_url(&url).ok().map(|u| u.to_string())
}

fn canonical_points_elsewhere(page: &PageRecord) -> bool {
    !page.canonical.is_empty() && normalized(&page.canonical).as_deref() != Some(page.url.as_str())
}

/// Classifies a page, returning no reasons when it is indexable
///
/// Reasons are returned in a fixed order: status error, redirect, noindex,
/// missing canonical, canonical to another URL, not in sitemap.
pub fn indexability_reasons(page: &PageRecord) -> Vec<IndexabilityReason> {
    let mut reasons = Vec::new();

    if page.status.is_error() {
        reasons.push(IndexabilityReason::StatusError);
    }
    if page.status.is_redirect() {
        reasons.push(IndexabilityReason::Redirect);
    }
    if page.noindex {
        reasons.push(IndexabilityReason::Noindex);
    }
    if page.canonical.is_empty() {
        reasons.push(IndexabilityReason::MissingCanonical);
    }
    if canonical_points_elsewhere(page) {
        reasons.push(IndexabilityReason::CanonicalToOther);
    }
    if !page.in_sitemap {
        reasons.push(IndexabilityReason::NotInSitemap);
    }

    reasons
}

pub fn is_indexable(page: &PageRecord) -> bool {
    indexability_reasons(page).is_empty()
}

/// Computes the summary counters for a set of pages
pub fn summarize(pages: &[PageRecord]) -> CrawlSummary {
    let mut summary = CrawlSummary {
        total_pages: pages.len(),
        ..Default::default()
    };
    let mut depth_total: u64 = 0;

    for page in pages {
        if page.status.is_ok() {
            summary.ok_pages += 1;
        }
        if page.status.is_redirect() {
            summary.redirects += 1;
        }
        if page.status.is_error() {
            summary.error_pages += 1;
        }
        if page.description_length == 0 {
            summary.missing_descriptions += 1;
        }
        if page.h1_count == 0 {
            summary.missing_h1 += 1;
        }
        if page.h1_count > 1 {
            summary.multiple_h1 += 1;
        }
        if is_thin(page) {
            summary.thin_pages += 1;
        }
        if page.noindex {
            summary.noindex_pages += 1;
        }
        if page.canonical.is_empty() {
            summary.missing_canonical += 1;
        } else {
            match Url::parse(&page.canonical) {
                Ok(canonical) if canonical.origin() == page.url.origin() => {}
                _ => summary.off_origin_canonical += 1,
            }
            if canonical_points_elsewhere(page) {
                summary.non_self_canonical += 1;
            }
        }
        if is_indexable(page) {
            summary.indexable += 1;
        }

        depth_total += u64::from(page.depth);
        summary.max_depth = summary.max_depth.max(page.depth);
    }

    if !pages.is_empty() {
        let avg = depth_total as f64 / pages.len() as f64;
        summary.avg_depth = (avg * 10.0).round() / 10.0;
    }
    summary.hreflang_missing_back = hreflang_issues(pages).len();

    summary
}

/// Counts pages per indexability reason, most common first
///
/// A page with several reasons is counted once under each; indexable pages
/// are counted under [`INDEXABLE_LABEL`].
pub fn indexability_breakdown(pages: &[PageRecord]) -> Vec<IndexabilityCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for page in pages {
        let reasons = indexability_reasons(page);
        if reasons.is_empty() {
            *counts.entry(INDEXABLE_LABEL.to_string()).or_default() += 1;
        }
        for reason in reasons {
            *counts.entry(reason.label().to_string()).or_default() += 1;
        }
    }

    let mut breakdown: Vec<IndexabilityCount> = counts
        .into_iter()
        .map(|(reason, count)| IndexabilityCount { reason, count })
        .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count));
    breakdown
}

/// Counts links pointing at each crawled page
///
/// Every crawled page has an entry, starting at zero. Links to pages outside
/// the crawl are ignored.
pub fn inbound_links(pages: &[PageRecord]) -> BTreeMap<String, usize> {
    let mut inbound: BTreeMap<String, usize> =
        pages.iter().map(|p| (p.url.to_string(), 0)).collect();

    for page in pages {
        for link in &page.internal_links {
            let Ok(link) = canonicalize_url(link) else {
                continue;
            };
            if let Some(count) = inbound.get_mut(link.as_str()) {
                *count += 1;
            }
        }
    }

    inbound
}

/// Sitemap-listed pages that no crawled page links to
pub fn orphan_candidates(pages: &[PageRecord], inbound: &BTreeMap<String, usize>) -> Vec<String> {
    pages
        .iter()
        .filter(|p| p.in_sitemap)
        .filter(|p| inbound.get(p.url.as_str()).copied().unwrap_or(0) == 0)
        .map(|p| p.url.to_string())
        .collect()
}

pub fn sitemap_stats(pages: &[PageRecord], inbound: &BTreeMap<String, usize>) -> SitemapStats {
    let in_sitemap = pages.iter().filter(|p| p.in_sitemap).count();
    let mut orphans = orphan_candidates(pages, inbound);
    orphans.truncate(SAMPLE_LIMIT);

    SitemapStats {
        in_sitemap,
        not_in_sitemap: pages.len() - in_sitemap,
        orphan_candidates: orphans,
        not_in_sitemap_samples: pages
            .iter()
            .filter(|p| !p.in_sitemap)
            .take(SAMPLE_LIMIT)
            .map(|p| p.url.to_string())
            .collect(),
    }
}

/// Pages per crawl depth for `0..=max_depth`
pub fn depth_distribution(pages: &[PageRecord], max_depth: u32) -> Vec<DepthBucket> {
    let mut buckets: Vec<DepthBucket> = (0..=max_depth)
        .map(|depth| DepthBucket { depth, count: 0 })
        .collect();

    for page in pages {
        if let Some(bucket) = buckets.get_mut(page.depth as usize) {
            bucket.count += 1;
        }
    }

    buckets
}

/// Titles used by more than one page, compared trimmed and case-folded
pub fn duplicate_titles(pages: &[PageRecord]) -> Vec<DuplicateGroup> {
    group_duplicates(pages, |page| page.title.as_str())
}

/// Meta descriptions used by more than one page
pub fn duplicate_descriptions(pages: &[PageRecord]) -> Vec<DuplicateGroup> {
    group_duplicates(pages, |page| page.description.as_str())
}

fn group_duplicates<F>(pages: &[PageRecord], field: F) -> Vec<DuplicateGroup>
where
    F: Fn(&PageRecord) -> &str,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for page in pages {
        let value = field(page).trim().to_lowercase();
        if value.is_empty() {
            continue;
        }
        let slot = *index.entry(value.clone()).or_insert_with(|| {
            groups.push(DuplicateGroup {
                value,
                urls: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].urls.push(page.url.to_string());
    }

    groups.retain(|g| g.urls.len() > 1);
    groups.truncate(SAMPLE_LIMIT);
    groups
}

/// Per-section page counts and defect tallies, largest sections first
pub fn path_map(pages: &[PageRecord]) -> Vec<PathSection> {
    let mut sections: Vec<PathSection> = Vec::new();

    for page in pages {
        let segment = page
            .url
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map_or_else(|| "/".to_string(), |first| format!("/{}/", first));
        let slot = match sections.iter().position(|s| s.segment == segment) {
            Some(slot) => slot,
            None => {
                sections.push(PathSection {
                    segment,
                    count: 0,
                    missing_description: 0,
                    missing_h1: 0,
                    thin: 0,
                });
                sections.len() - 1
            }
        };

        let section = &mut sections[slot];
        section.count += 1;
        if page.description_length == 0 {
            section.missing_description += 1;
        }
        if page.h1_count == 0 {
            section.missing_h1 += 1;
        }
        if is_thin(page) {
            section.thin += 1;
        }
    }

    sections.sort_by(|a, b| b.count.cmp(&a.count));
    sections.truncate(PATH_MAP_LIMIT);
    sections
}

pub fn content_stats(pages: &[PageRecord]) -> ContentStats {
    let mut stats = ContentStats::default();
    let mut total_words = 0;

    for page in pages {
        if page.title.is_empty() {
            stats.missing_title += 1;
        }
        if page.description_length == 0 {
            stats.missing_description += 1;
        }
        if page.h1_count == 0 {
            stats.missing_h1 += 1;
        }
        if is_thin(page) {
            stats.thin += 1;
        }
        total_words += page.word_count;
    }

    if !pages.is_empty() {
        stats.avg_words = (total_words as f64 / pages.len() as f64).round() as usize;
    }
    stats
}

/// Counts redirects, errors, noindex and canonical problems
///
/// A page lacking a canonical is counted only as missing, never as pointing
/// elsewhere.
pub fn blocker_stats(pages: &[PageRecord]) -> BlockerStats {
    let mut stats = BlockerStats::default();

    for page in pages {
        let redirect_or_worse = matches!(page.status.code(), Some(code) if code >= 300);
        if page.status.is_redirect() {
            stats.redirects += 1;
        }
        if page.status.is_error() {
            stats.errors += 1;
        }
        if page.noindex {
            stats.noindex += 1;
        }
        if page.canonical.is_empty() {
            stats.canonical_missing += 1;
        }
        if canonical_points_elsewhere(page) {
            stats.canonical_other += 1;
        }
        if stats.samples.len() < BLOCKER_SAMPLE_LIMIT
            && (page.noindex || redirect_or_worse || page.canonical.is_empty())
        {
            stats.samples.push(page.url.to_string());
        }
    }

    stats
}

/// hreflang alternates between crawled pages that are not reciprocated
pub fn hreflang_issues(pages: &[PageRecord]) -> Vec<HreflangIssue> {
    let by_url: HashMap<&str, &PageRecord> = pages.iter().map(|p| (p.url.as_str(), p)).collect();
    let mut issues = Vec::new();

    for page in pages {
        let source = page.url.as_str();
        for entry in &page.hreflang {
            let Some(target) = normalized(&entry.href) else {
                continue;
            };
            let Some(target_page) = by_url.get(target.as_str()) else {
                continue;
            };
            let links_back = target_page
                .hreflang
                .iter()
                .any(|back| normalized(&back.href).as_deref() == Some(source));
            if !links_back {
                issues.push(HreflangIssue {
                    source: source.to_string(),
                    target,
                    lang: entry.lang.clone(),
                });
            }
        }
    }

    issues
}
