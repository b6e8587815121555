//! Template clustering
//!
//! Pages that share a structural signature (path depth, title shape, H1
//! count, description and word-count buckets) are grouped into one cluster.
//! Defects that affect most of a cluster point at the template rather than at
//! individual pages.

mod history;
mod signature;

pub use history::{diff, ClusterDelta, ClusterSummary, CrawlSnapshot, SNAPSHOT_RETENTION};
pub use signature::{title_pattern, ClusterSignature, DescriptionBucket, WordBucket};

use crate::crawler::PageRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// Share of a cluster above which a defect is reported as a template issue
pub const ALERT_THRESHOLD: f64 = 0.6;

/// Pages with fewer words than this (but more than zero) count as thin
pub const THIN_WORD_LIMIT: usize = 300;

/// A group of pages sharing one signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub signature: ClusterSignature,
    pub key: String,
    pub sample_url: Url,
    pub count: usize,
    pub missing_description: usize,
    pub missing_h1: usize,
    pub multiple_h1: usize,
    pub thin: usize,
}

impl Cluster {
    fn new(signature: ClusterSignature, sample_url: Url) -> Self {
        Self {
            key: signature.to_string(),
            signature,
            sample_url,
            count: 0,
            missing_description: 0,
            missing_h1: 0,
            multiple_h1: 0,
            thin: 0,
        }
    }

    fn add(&mut self, page: &PageRecord) {
        self.count += 1;
        if page.description_length == 0 {
            self.missing_description += 1;
        }
        if page.h1_count == 0 {
            self.missing_h1 += 1;
        }
        if page.h1_count > 1 {
            self.multiple_h1 += 1;
        }
        if page.word_count > 0 && page.word_count < THIN_WORD_LIMIT {
            self.thin += 1;
        }
    }

    fn rate(&self, defects: usize) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            defects as f64 / self.count as f64
        }
    }

    pub fn missing_description_rate(&self) -> f64 {
        self.rate(self.missing_description)
    }

    pub fn missing_h1_rate(&self) -> f64 {
        self.rate(self.missing_h1)
    }

    pub fn multiple_h1_rate(&self) -> f64 {
        self.rate(self.multiple_h1)
    }

    pub fn thin_rate(&self) -> f64 {
        self.rate(self.thin)
    }

    pub fn summary(&self) -> ClusterSummary {
        ClusterSummary {
            signature: self.key.clone(),
            count: self.count,
            missing_description: self.missing_description,
            missing_h1: self.missing_h1,
            multiple_h1: self.multiple_h1,
            thin: self.thin,
            missing_description_rate: self.missing_description_rate(),
            missing_h1_rate: self.missing_h1_rate(),
            multiple_h1_rate: self.multiple_h1_rate(),
            thin_rate: self.thin_rate(),
        }
    }
}

/// Groups pages by signature
///
/// Clusters are sorted by size, largest first, then by signature text.
pub fn cluster(pages: &[PageRecord]) -> Vec<Cluster> {
    let mut clusters: HashMap<ClusterSignature, Cluster> = HashMap::new();

    for page in pages {
        let signature = ClusterSignature::of(page);
        clusters
            .entry(signature.clone())
            .or_insert_with(|| Cluster::new(signature, page.url.clone()))
            .add(page);
    }

    let mut clusters: Vec<Cluster> = clusters.into_values().collect();
    clusters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    clusters
}

/// Template issues for clusters where a defect rate exceeds [`ALERT_THRESHOLD`]
pub fn alerts(clusters: &[Cluster]) -> Vec<String> {
    let mut alerts = Vec::new();

    for cluster in clusters {
        if cluster.missing_description_rate() > ALERT_THRESHOLD {
            alerts.push(format!(
                "Template issue: {} pages missing meta descriptions.",
                cluster.count
            ));
        }
        if cluster.missing_h1_rate() > ALERT_THRESHOLD {
            alerts.push(format!(
                "Template issue: {} pages missing H1 tags.",
                cluster.count
            ));
        }
        if cluster.multiple_h1_rate() > ALERT_THRESHOLD {
            alerts.push(format!(
                "Template issue: {} pages with multiple H1 tags.",
                cluster.count
            ));
        }
        if cluster.thin_rate() > ALERT_THRESHOLD {
            alerts.push(format!(
                "Template issue: {} pages appear thin (< {} words).",
                cluster.count, THIN_WORD_LIMIT
            ));
        }
    }

    alerts
}

/// Captures the clusters of a run for the snapshot store
pub fn snapshot(clusters: &[Cluster], taken_at: DateTime<Utc>) -> CrawlSnapshot {
    CrawlSnapshot {
        taken_at,
        clusters: clusters.iter().map(Cluster::summary).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{PageSource, PageStatus};

    fn page(path: &str, title: &str, description_length: usize, h1_count: usize, words: usize) -> PageRecord {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        PageRecord {
            url: url.clone(),
            final_url: url,
            status: PageStatus::Code(200),
            title: title.to_string(),
            description: String::new(),
            description_length,
            h1_count,
            h1_text: String::new(),
            word_count: words,
            canonical: String::new(),
            meta_robots: String::new(),
            googlebot_meta: String::new(),
            bingbot_meta: String::new(),
            noindex: false,
            schema_types: Vec::new(),
            hreflang: Vec::new(),
            internal_links: Vec::new(),
            depth: 1,
            source: PageSource::Discovered,
            discovered_from: None,
            in_sitemap: false,
            content_length: 0,
            content_type: String::new(),
        }
    }

    #[test]
    fn test_numbered_titles_share_cluster() {
        let pages = vec![
            page("/products/123", "Product 123", 0, 1, 500),
            page("/products/456", "Product 456", 0, 1, 500),
            page("/about", "About us", 120, 1, 900),
        ];
        let clusters = cluster(&pages);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(clusters[0].key, "2|Product {#}|h11|empty|mid");
        assert_eq!(clusters[0].sample_url.path(), "/products/123");
    }

    #[test]
    fn test_missing_description_alert() {
        let pages = vec![
            page("/p/1", "Product 1", 0, 1, 500),
            page("/p/2", "Product 2", 0, 1, 500),
            page("/p/3", "Product 3", 0, 1, 500),
        ];
        let clusters = cluster(&pages);
        assert_eq!(clusters[0].missing_description_rate(), 1.0);
        assert_eq!(
            alerts(&clusters),
            vec!["Template issue: 3 pages missing meta descriptions."]
        );
    }

    #[test]
    fn test_alert_threshold_is_strict() {
        // Buckets differ, so build a single cluster by hand at exactly 60%
        let mut c = Cluster::new(
            ClusterSignature::of(&page("/a", "A", 0, 1, 500)),
            Url::parse("https://example.com/a").unwrap(),
        );
        c.count = 5;
        c.missing_h1 = 3;
        assert!(alerts(&[c.clone()]).is_empty());

        c.missing_h1 = 4;
        assert_eq!(alerts(&[c]), vec!["Template issue: 5 pages missing H1 tags."]);
    }

    #[test]
    fn test_defect_counts() {
        let pages = vec![
            page("/x/1", "T", 10, 0, 0),
            page("/x/2", "T", 10, 0, 0),
        ];
        let clusters = cluster(&pages);
        let c = &clusters[0];
        assert_eq!(c.missing_description, 0);
        assert_eq!(c.missing_h1, 2);
        // zero words is not thin
        assert_eq!(c.thin, 0);

        let thin = cluster(&[page("/y", "T", 10, 2, 120)]);
        assert_eq!(thin[0].thin, 1);
        assert_eq!(thin[0].multiple_h1, 1);
    }

    #[test]
    fn test_sorted_by_size_then_signature() {
        let pages = vec![
            page("/b", "B", 10, 1, 500),
            page("/a", "A", 10, 1, 500),
            page("/c/1", "C", 10, 1, 500),
            page("/c/2", "C", 10, 1, 500),
        ];
        let keys: Vec<_> = cluster(&pages).into_iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec!["2|C|h11|short|mid", "1|A|h11|short|mid", "1|B|h11|short|mid"]
        );
    }

    #[test]
    fn test_snapshot_carries_rates() {
        let pages = vec![
            page("/p/1", "Product 1", 0, 1, 500),
            page("/p/2", "Product 2", 100, 1, 500),
        ];
        let snap = snapshot(&cluster(&pages), Utc::now());
        assert_eq!(snap.clusters.len(), 2);
        assert!(snap.clusters.iter().all(|c| c.count == 1));
    }
}
