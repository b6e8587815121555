//! Cluster snapshots and run-over-run diffs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of snapshots retained per origin
pub const SNAPSHOT_RETENTION: usize = 5;

/// Persisted form of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub signature: String,
    pub count: usize,
    pub missing_description: usize,
    pub missing_h1: usize,
    pub multiple_h1: usize,
    pub thin: usize,
    pub missing_description_rate: f64,
    pub missing_h1_rate: f64,
    pub multiple_h1_rate: f64,
    pub thin_rate: f64,
}

/// The clusters of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSnapshot {
    pub taken_at: DateTime<Utc>,
    pub clusters: Vec<ClusterSummary>,
}

/// Change of one cluster against the previous snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterDelta {
    pub signature: String,
    /// False when the signature did not exist in the previous snapshot
    pub existed_before: bool,
    pub count_delta: i64,
    pub missing_description_rate_delta: f64,
    pub missing_h1_rate_delta: f64,
    pub multiple_h1_rate_delta: f64,
    pub thin_rate_delta: f64,
}

/// Compares the newest snapshot with the one before it
///
/// `history` is newest first. Signatures that are new in the latest snapshot
/// report their current values as the delta. Fewer than two snapshots yields
/// no deltas.
pub fn diff(history: &[CrawlSnapshot]) -> Vec<ClusterDelta> {
    let (Some(latest), Some(previous)) = (history.first(), history.get(1)) else {
        return Vec::new();
    };

    let before: HashMap<&str, &ClusterSummary> = previous
        .clusters
        .iter()
        .map(|c| (c.signature.as_str(), c))
        .collect();

    latest
        .clusters
        .iter()
        .map(|current| match before.get(current.signature.as_str()) {
            Some(prior) => ClusterDelta {
                signature: current.signature.clone(),
                existed_before: true,
                count_delta: current.count as i64 - prior.count as i64,
                missing_description_rate_delta: current.missing_description_rate
                    - prior.missing_description_rate,
                missing_h1_rate_delta: current.missing_h1_rate - prior.missing_h1_rate,
                multiple_h1_rate_delta: current.multiple_h1_rate - prior.multiple_h1_rate,
                thin_rate_delta: current.thin_rate - prior.thin_rate,
            },
            None => ClusterDelta {
                signature: current.signature.clone(),
                existed_before: false,
                count_delta: current.count as i64,
                missing_description_rate_delta: current.missing_description_rate,
                missing_h1_rate_delta: current.missing_h1_rate,
                multiple_h1_rate_delta: current.multiple_h1_rate,
                thin_rate_delta: current.thin_rate,
            },
        })
        .collect()
}
