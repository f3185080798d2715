//! Dashboard totals and contribution ranking.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Aggregate view over a set of records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_records: usize,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    /// Mean contribution score; 0 for an empty set.
    pub average_contribution: f64,
}

/// Fold records into a [`Summary`]. Counter totals saturate.
pub fn summarize(records: &[Record]) -> Summary {
    let mut summary = Summary {
        total_records: records.len(),
        ..Summary::default()
    };
    let mut score_sum = 0.0;
    for record in records {
        summary.total_impressions = summary.total_impressions.saturating_add(record.impressions);
        summary.total_clicks = summary.total_clicks.saturating_add(record.clicks);
        summary.total_conversions = summary.total_conversions.saturating_add(record.conversions);
        score_sum += record.contribution_score;
    }
    if !records.is_empty() {
        summary.average_contribution = score_sum / records.len() as f64;
    }
    summary
}

/// The `limit` records with the highest contribution score, highest first.
///
/// Equal scores keep their input order.
pub fn rank_by_contribution(records: &[Record], limit: usize) -> Vec<&Record> {
    let mut ranked: Vec<&Record> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.contribution_score
            .partial_cmp(&a.contribution_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}
