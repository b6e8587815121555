//! Console output for audits and stored history

use crate::cluster::{ClusterDelta, CrawlSnapshot};
use crate::output::AuditReport;

/// Prints the headline numbers of an audit to stdout
pub fn print_report(report: &AuditReport) {
    let summary = &report.summary;

    println!("=== SiteGauge Audit: {} ===\n", report.origin);

    println!("Overview:");
    println!("  Pages crawled: {}", summary.total_pages);
    println!("  Sources: {}", report.source_tally);
    println!(
        "  Indexable: {} ({:.1}%)",
        summary.indexable,
        summary.indexable_rate()
    );
    println!(
        "  OK: {}  Redirects: {}  Errors: {}",
        summary.ok_pages, summary.redirects, summary.error_pages
    );
    println!(
        "  Average depth: {:.1}  Max depth: {}",
        summary.avg_depth, summary.max_depth
    );
    println!(
        "  Average words: {}  Missing titles: {}",
        report.content_stats.avg_words, report.content_stats.missing_title
    );
    println!();

    if !report.indexability.is_empty() {
        println!("Indexability:");
        for entry in &report.indexability {
            let percentage = if summary.total_pages > 0 {
                (entry.count as f64 / summary.total_pages as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", entry.reason, entry.count, percentage);
        }
        println!();
    }

    if !report.ai_visibility.is_empty() {
        println!("AI crawler visibility:");
        for verdict in &report.ai_visibility {
            let status = if verdict.allowed { "allowed" } else { "blocked" };
            let reasons: Vec<_> = verdict.reasons.iter().map(|r| r.label()).collect();
            if reasons.is_empty() {
                println!("  {}: {}", verdict.agent_name, status);
            } else {
                println!("  {}: {} ({})", verdict.agent_name, status, reasons.join(", "));
            }
        }
        println!();
    }

    println!("Template clusters: {}", report.clusters.len());
    for alert in &report.alerts {
        println!("  ! {}", alert);
    }
    println!();

    if !report.diagnostics.is_empty() {
        println!("Diagnostics ({}):", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("  - {}", diagnostic);
        }
        println!();
    }
}

/// Prints stored snapshots (newest first) and the latest diff
pub fn print_history(origin: &str, history: &[CrawlSnapshot], deltas: &[ClusterDelta]) {
    println!("=== Snapshot History: {} ===\n", origin);

    if history.is_empty() {
        println!("No snapshots stored.");
        return;
    }

    for snapshot in history {
        let pages: usize = snapshot.clusters.iter().map(|c| c.count).sum();
        println!(
            "  {}  {} clusters, {} pages",
            snapshot.taken_at.to_rfc3339(),
            snapshot.clusters.len(),
            pages
        );
    }
    println!();

    if deltas.is_empty() {
        println!("Not enough snapshots to compare.");
        return;
    }

    println!("Changes since previous snapshot:");
    for delta in deltas {
        let marker = if delta.existed_before { "" } else { " (new)" };
        println!(
            "  {}{}: pages {:+}, missing description {:+.0}%, missing H1 {:+.0}%, thin {:+.0}%",
            delta.signature,
            marker,
            delta.count_delta,
            delta.missing_description_rate_delta * 100.0,
            delta.missing_h1_rate_delta * 100.0,
            delta.thin_rate_delta * 100.0
        );
    }
}
