use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::requirement::RequirementType;

/// Outcome of checking one requirement against one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementMatch {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: RequirementType,
    pub required_value: Value,
    pub candidate_value: String,
    pub matched: bool,
}

/// Checklist score of a profile against a single requirement spec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub total_requirements: usize,
    pub matched: usize,
    /// `matched / total_requirements * 100`, two decimals; 0 when empty.
    pub percentage: f64,
    pub results: Vec<RequirementMatch>,
}

impl ScoreResult {
    pub fn from_matches(results: Vec<RequirementMatch>) -> Self {
        let total_requirements = results.len();
        let matched = results.iter().filter(|r| r.matched).count();
        ScoreResult {
            total_requirements,
            matched,
            percentage: percentage(matched, total_requirements),
            results,
        }
    }
}

fn percentage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = matched as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
