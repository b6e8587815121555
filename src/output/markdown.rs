//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of an audit,
//! including statistics, template clusters and AI crawler visibility.

use crate::output::{AuditReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Rows shown in URL-heavy tables
const TABLE_LIMIT: usize = 20;

/// Writes the markdown summary of `report` to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_report(report: &AuditReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

fn signed(value: f64) -> String {
    format!("{:+.0}%", value * 100.0)
}

/// Formats an audit report as markdown
pub fn format_markdown_report(report: &AuditReport) -> String {
    let mut md = String::new();
    let summary = &report.summary;

    md.push_str(&format!("# SiteGauge Audit: {}\n\n", report.origin));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        report.duration_seconds()
    ));
    md.push_str(&format!(
        "- **Budget**: {} pages, depth {}\n",
        report.budget.max_pages(),
        report.budget.max_depth()
    ));
    md.push_str(&format!("- **Sources**: {}\n", report.source_tally));
    if report.was_cancelled() {
        md.push_str("- **Status**: cancelled\n");
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overview\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    for (label, value) in [
        ("Pages crawled", summary.total_pages),
        ("OK (2xx)", summary.ok_pages),
        ("Redirects", summary.redirects),
        ("Errors", summary.error_pages),
        ("Indexable", summary.indexable),
        ("Noindex", summary.noindex_pages),
        ("Missing canonical", summary.missing_canonical),
        ("Canonical off-origin", summary.off_origin_canonical),
        ("Canonical to other URL", summary.non_self_canonical),
        ("Missing meta description", summary.missing_descriptions),
        ("Missing H1", summary.missing_h1),
        ("Multiple H1", summary.multiple_h1),
        ("Thin pages", summary.thin_pages),
        ("hreflang without return link", summary.hreflang_missing_back),
    ] {
        md.push_str(&format!("| {} | {} |\n", label, value));
    }
    md.push_str(&format!(
        "\nAverage depth {:.1}, max depth {}.\n\n",
        summary.avg_depth, summary.max_depth
    ));

    // Indexability
    if !report.indexability.is_empty() {
        md.push_str("## Indexability\n\n");
        md.push_str("| Reason | Pages |\n");
        md.push_str("|--------|-------|\n");
        for entry in &report.indexability {
            md.push_str(&format!("| {} | {} |\n", entry.reason, entry.count));
        }
        md.push('\n');
    }

    // AI crawler visibility
    if !report.ai_visibility.is_empty() {
        md.push_str("## AI Crawler Visibility\n\n");
        md.push_str("| Agent | Token | Allowed | Images | Rule | Blocked by |\n");
        md.push_str("|-------|-------|---------|--------|------|------------|\n");
        for verdict in &report.ai_visibility {
            let rule = verdict
                .matched_rule
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let reasons = if verdict.reasons.is_empty() {
                "-".to_string()
            } else {
                verdict
                    .reasons
                    .iter()
                    .map(|r| r.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                verdict.agent_name,
                verdict.user_agent_token,
                if verdict.allowed { "yes" } else { "no" },
                if verdict.images_allowed { "yes" } else { "no" },
                rule,
                reasons
            ));
        }
        md.push('\n');
    }

    // Template clusters
    if !report.clusters.is_empty() {
        md.push_str("## Template Clusters\n\n");
        md.push_str("| Signature | Pages | No description | No H1 | Multiple H1 | Thin |\n");
        md.push_str("|-----------|-------|----------------|-------|-------------|------|\n");
        for cluster in &report.clusters {
            md.push_str(&format!(
                "| `{}` | {} | {} | {} | {} | {} |\n",
                cluster.key,
                cluster.count,
                percent(cluster.missing_description_rate()),
                percent(cluster.missing_h1_rate()),
                percent(cluster.multiple_h1_rate()),
                percent(cluster.thin_rate())
            ));
        }
        md.push('\n');
    }

    if !report.alerts.is_empty() {
        md.push_str("### Alerts\n\n");
        for alert in &report.alerts {
            md.push_str(&format!("- {}\n", alert));
        }
        md.push('\n');
    }

    if !report.cluster_deltas.is_empty() {
        md.push_str("### Changes Since Previous Run\n\n");
        md.push_str("| Signature | Pages | No description | No H1 | Thin |\n");
        md.push_str("|-----------|-------|----------------|-------|------|\n");
        for delta in &report.cluster_deltas {
            let marker = if delta.existed_before { "" } else { " (new)" };
            md.push_str(&format!(
                "| `{}`{} | {:+} | {} | {} | {} |\n",
                delta.signature,
                marker,
                delta.count_delta,
                signed(delta.missing_description_rate_delta),
                signed(delta.missing_h1_rate_delta),
                signed(delta.thin_rate_delta)
            ));
        }
        md.push('\n');
    }

    // Sitemap coverage
    let sitemap = &report.sitemap_stats;
    md.push_str("## Sitemap Coverage\n\n");
    md.push_str(&format!("- **In sitemap**: {}\n", sitemap.in_sitemap));
    md.push_str(&format!("- **Not in sitemap**: {}\n", sitemap.not_in_sitemap));
    if !sitemap.orphan_candidates.is_empty() {
        md.push_str("\nOrphan candidates (listed in the sitemap, no inbound links):\n\n");
        for url in &sitemap.orphan_candidates {
            md.push_str(&format!("- {}\n", url));
        }
    }
    md.push('\n');

    // Site sections
    if !report.path_map.is_empty() {
        md.push_str("## Site Sections\n\n");
        md.push_str("| Section | Pages | No description | No H1 | Thin |\n");
        md.push_str("|---------|-------|----------------|-------|------|\n");
        for section in &report.path_map {
            md.push_str(&format!(
                "| `{}` | {} | {} | {} | {} |\n",
                section.segment,
                section.count,
                section.missing_description,
                section.missing_h1,
                section.thin
            ));
        }
        md.push('\n');
    }

    let content = &report.content_stats;
    md.push_str("## Content\n\n");
    md.push_str(&format!("- **Missing title**: {}\n", content.missing_title));
    md.push_str(&format!(
        "- **Missing description**: {}\n",
        content.missing_description
    ));
    md.push_str(&format!("- **Missing H1**: {}\n", content.missing_h1));
    md.push_str(&format!("- **Thin pages**: {}\n", content.thin));
    md.push_str(&format!("- **Average words**: {}\n", content.avg_words));
    if !report.intent_mix.is_empty() {
        let mix = report
            .intent_mix
            .iter()
            .map(|entry| format!("{} {}", entry.intent, entry.count))
            .collect::<Vec<_>>()
            .join(", ");
        md.push_str(&format!("- **Intent mix**: {}\n", mix));
    }
    md.push('\n');

    let blockers = &report.blocker_stats;
    if !blockers.samples.is_empty() {
        md.push_str("## Index Blockers\n\n");
        md.push_str(&format!(
            "{} redirects, {} errors, {} noindex, {} missing canonical, {} canonical to other URL.\n\n",
            blockers.redirects,
            blockers.errors,
            blockers.noindex,
            blockers.canonical_missing,
            blockers.canonical_other
        ));
        for url in &blockers.samples {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    // Depth breakdown
    if report.depth_distribution.iter().any(|b| b.count > 0) {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for bucket in &report.depth_distribution {
            md.push_str(&format!("| {} | {} |\n", bucket.depth, bucket.count));
        }
        md.push('\n');
    }

    if !report.duplicate_titles.is_empty() {
        md.push_str("## Duplicate Titles\n\n");
        for group in &report.duplicate_titles {
            md.push_str(&format!("- \"{}\" ({} pages)\n", group.value, group.urls.len()));
            for url in &group.urls {
                md.push_str(&format!("  - {}\n", url));
            }
        }
        md.push('\n');
    }

    if !report.duplicate_descriptions.is_empty() {
        md.push_str("## Duplicate Descriptions\n\n");
        for group in &report.duplicate_descriptions {
            md.push_str(&format!("- \"{}\" ({} pages)\n", group.value, group.urls.len()));
            for url in &group.urls {
                md.push_str(&format!("  - {}\n", url));
            }
        }
        md.push('\n');
    }

    if !report.cannibalization.is_empty() {
        md.push_str("## Possible Cannibalization\n\n");
        for group in &report.cannibalization {
            md.push_str(&format!("- {}: {}\n", group.intent, group.urls.join(", ")));
        }
        md.push('\n');
    }

    if !report.hreflang_issues.is_empty() {
        md.push_str("## hreflang Reciprocity\n\n");
        md.push_str("| Source | Target | Lang |\n");
        md.push_str("|--------|--------|------|\n");
        for issue in report.hreflang_issues.iter().take(TABLE_LIMIT) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                issue.source, issue.target, issue.lang
            ));
        }
        md.push('\n');
    }

    // Pages
    if !report.pages.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| URL | Status | Depth | Source | Inbound | Title |\n");
        md.push_str("|-----|--------|-------|--------|---------|-------|\n");
        for page in &report.pages {
            let inbound = report.inbound.get(page.url.as_str()).copied().unwrap_or(0);
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                page.url,
                page.status,
                page.depth,
                page.source,
                inbound,
                page.title.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    if !report.diagnostics.is_empty() {
        md.push_str("## Diagnostics\n\n");
        for diagnostic in &report.diagnostics {
            md.push_str(&format!("- {}\n", diagnostic));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{alerts, cluster};
    use crate::crawler::{CrawlBudget, PageRecord, PageSource, PageStatus, SourceTally};
    use crate::output::{content_stats, intent_mix, path_map, summarize, BlockerStats, SitemapStats};
    use crate::Diagnostic;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use url::Url;

    fn page(path: &str, title: &str) -> PageRecord {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        PageRecord {
            url: url.clone(),
            final_url: url,
            status: PageStatus::Code(200),
            title: title.to_string(),
            description: String::new(),
            description_length: 0,
            h1_count: 1,
            h1_text: String::new(),
            word_count: 400,
            canonical: String::new(),
            meta_robots: String::new(),
            googlebot_meta: String::new(),
            bingbot_meta: String::new(),
            noindex: false,
            schema_types: Vec::new(),
            hreflang: Vec::new(),
            internal_links: Vec::new(),
            depth: 1,
            source: PageSource::Sitemap,
            discovered_from: None,
            in_sitemap: true,
            content_length: 0,
            content_type: String::new(),
        }
    }

    fn create_test_report() -> AuditReport {
        let pages = vec![page("/p/1", "Product 1"), page("/p/2", "Product 2")];
        let clusters = cluster(&pages);
        let sections = path_map(&pages);
        let content = content_stats(&pages);
        let intents = intent_mix(&pages);
        AuditReport {
            origin: "https://example.com".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 42).unwrap(),
            budget: CrawlBudget::new(20, 5),
            summary: summarize(&pages),
            alerts: alerts(&clusters),
            clusters,
            pages,
            indexability: Vec::new(),
            inbound: BTreeMap::new(),
            orphan_candidates: Vec::new(),
            cluster_deltas: Vec::new(),
            ai_visibility: Vec::new(),
            sitemap_stats: SitemapStats::default(),
            depth_distribution: Vec::new(),
            duplicate_titles: Vec::new(),
            duplicate_descriptions: Vec::new(),
            hreflang_issues: Vec::new(),
            path_map: sections,
            content_stats: content,
            blocker_stats: BlockerStats::default(),
            intent_mix: intents,
            cannibalization: Vec::new(),
            source_tally: SourceTally {
                sitemap: 2,
                seed: 0,
                discovered: 0,
            },
            diagnostics: vec![Diagnostic::RobotsUnavailable {
                origin: "https://example.com".to_string(),
                message: "HTTP 404".to_string(),
            }],
        }
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("# SiteGauge Audit: https://example.com"));
        assert!(markdown.contains("- **Duration**: 42 seconds"));
        assert!(markdown.contains("| Pages crawled | 2 |"));
        assert!(markdown.contains("sitemap: 2, seed: 0, discovered: 0"));
    }

    #[test]
    fn test_markdown_contains_clusters_and_alerts() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("## Template Clusters"));
        assert!(markdown.contains("`2|Product {#}|h11|empty|mid`"));
        assert!(markdown.contains("Template issue: 2 pages missing meta descriptions."));
    }

    #[test]
    fn test_markdown_sections_and_content() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("## Site Sections"));
        assert!(markdown.contains("| `/p/` | 2 | 2 | 0 | 0 |"));
        assert!(markdown.contains("- **Average words**: 400"));
        assert!(markdown.contains("- **Intent mix**: Informational 2"));
        assert!(!markdown.contains("## Index Blockers"));
    }

    #[test]
    fn test_markdown_lists_diagnostics() {
        let markdown = format_markdown_report(&create_test_report());
        assert!(markdown.contains("## Diagnostics"));
        assert!(markdown.contains("robots.txt not available for https://example.com: HTTP 404"));
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        generate_markdown_report(&create_test_report(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# SiteGauge Audit"));
    }
}
