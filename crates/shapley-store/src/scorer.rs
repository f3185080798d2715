//! Contribution score formula.
//!
//! Ranks a campaign's attribution weight from its raw event counters:
//!
//! ```text
//! score = (clicks / impressions) * 0.4
//!       + (conversions / max(clicks, 1)) * 0.6      (0 when impressions == 0)
//! ```
//!
//! The result is not clamped. Conversions can exceed clicks (view-through
//! conversions), which pushes the conversion term above 0.6 and the score
//! above 1.

use serde::{Deserialize, Serialize};

/// Weight of the click-through term.
pub const W_CTR: f64 = 0.4;

/// Weight of the conversion term.
pub const W_CVR: f64 = 0.6;

/// Breakdown of a contribution score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// `(clicks / impressions) * W_CTR`.
    pub ctr_term: f64,
    /// `(conversions / max(clicks, 1)) * W_CVR`.
    pub cvr_term: f64,
    /// Sum of both terms.
    pub score: f64,
}

/// Compute the contribution score.
pub fn score(impressions: u64, clicks: u64, conversions: u64) -> f64 {
    score_breakdown(impressions, clicks, conversions).score
}

/// Compute the contribution score with its two terms.
pub fn score_breakdown(impressions: u64, clicks: u64, conversions: u64) -> ScoreBreakdown {
    if impressions == 0 {
        return ScoreBreakdown {
            ctr_term: 0.0,
            cvr_term: 0.0,
            score: 0.0,
        };
    }

    let ctr_term = (clicks as f64 / impressions as f64) * W_CTR;
    let cvr_term = (conversions as f64 / clicks.max(1) as f64) * W_CVR;

    ScoreBreakdown {
        ctr_term,
        cvr_term,
        score: ctr_term + cvr_term,
    }
}
