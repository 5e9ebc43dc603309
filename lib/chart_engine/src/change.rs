use chart_query::SeriesResult;
use serde::{Deserialize, Serialize};

/// Percentage change between the last primary point and the last aligned comparison point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResult {
    pub percentage: Option<f64>,
    pub current: Option<f64>,
    pub baseline: Option<f64>,
}

pub fn compute_change(primary: &SeriesResult, aligned_comparison: &SeriesResult) -> ChangeResult {
    let current = primary.last().map(|p| p.value);
    let baseline = aligned_comparison.last().map(|p| p.value);
    let percentage = match (current, baseline) {
        (Some(c), Some(b)) if b != 0.0 => Some(round_to_hundredths((c - b) / b * 100.0)),
        _ => None,
    };
    ChangeResult {
        percentage,
        current,
        baseline,
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
