use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{RequestRecord, round_to};

const EXPENSIVE_MODELS: &[&str] = &["gpt-4", "gpt-4-turbo", "gpt-4o"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub count: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencySuggestion {
    pub text: String,
    pub savings: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub total_requests: u64,
    pub total_cost: f64,
    pub avg_cost_per_request: f64,
    pub model_distribution: BTreeMap<String, ModelUsage>,
    pub unique_prompts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub score: f64,
    pub grade: String,
    pub analysis: String,
    pub suggestions: Vec<EfficiencySuggestion>,
    pub positive_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EfficiencyMetrics>,
}

impl EfficiencyReport {
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            grade: "N/A".to_string(),
            analysis: "No data available for analysis".to_string(),
            suggestions: Vec::new(),
            positive_points: Vec::new(),
            metrics: None,
        }
    }
}

pub fn grade_for_score(score: f64) -> &'static str {
    if score >= 85.0 {
        "A"
    } else if score >= 70.0 {
        "B"
    } else if score >= 55.0 {
        "C"
    } else if score >= 40.0 {
        "D"
    } else {
        "F"
    }
}

/// Scores a project's spending habits over `records`: 40% cost per request,
/// 30% reliance on expensive models, 30% prompt diversity.
pub fn compute_efficiency(records: &[RequestRecord]) -> EfficiencyReport {
    if records.is_empty() {
        return EfficiencyReport::empty();
    }
    let total_requests = records.len() as u64;
    let total_cost: f64 = records.iter().map(|record| record.total_cost_usd).sum();
    let avg_cost = total_cost / total_requests as f64;

    let mut model_distribution: BTreeMap<String, ModelUsage> = BTreeMap::new();
    for record in records {
        let model = if record.model.is_empty() {
            "unknown"
        } else {
            record.model.as_str()
        };
        let usage = model_distribution.entry(model.to_string()).or_default();
        usage.count += 1;
        usage.cost += record.total_cost_usd;
    }
    let expensive_count: u64 = EXPENSIVE_MODELS
        .iter()
        .filter_map(|model| model_distribution.get(*model))
        .map(|usage| usage.count)
        .sum();
    let expensive_share = expensive_count as f64 / total_requests as f64;

    let unique_prompts = records
        .iter()
        .map(|record| record.prompt_fingerprint.as_deref().unwrap_or(""))
        .collect::<HashSet<_>>()
        .len() as u64;
    let unique_share = unique_prompts as f64 / total_requests as f64;

    let cost_score = (100.0 - avg_cost * 1000.0).max(0.0) * 0.4;
    let model_score = (100.0 - expensive_share * 100.0).max(0.0) * 0.3;
    let pattern_score = (unique_share * 200.0).min(100.0) * 0.3;
    let score = (cost_score + model_score + pattern_score).clamp(0.0, 100.0);

    let mut suggestions = Vec::new();
    let mut positive_points = Vec::new();
    if avg_cost > 0.05 {
        suggestions.push(EfficiencySuggestion {
            text: "Consider using more economical models to reduce average request cost"
                .to_string(),
            savings: Some(format!(
                "Estimated savings: ${:.2}",
                avg_cost * total_requests as f64 * 0.3
            )),
        });
    } else {
        positive_points.push("Good cost control, low average request cost".to_string());
    }
    if expensive_share > 0.7 {
        suggestions.push(EfficiencySuggestion {
            text: "Over-reliance on expensive models, consider mixing in economical models"
                .to_string(),
            savings: Some(format!("Estimated savings: ${:.2}", total_cost * 0.4)),
        });
    } else {
        positive_points.push("Reasonable model selection, balanced cost distribution".to_string());
    }
    if unique_share < 0.3 {
        suggestions.push(EfficiencySuggestion {
            text: "Request patterns are repetitive, consider diversifying prompts".to_string(),
            savings: None,
        });
    } else {
        positive_points.push("Diverse request patterns support overall efficiency".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push(EfficiencySuggestion {
            text: "Continue maintaining current API usage patterns".to_string(),
            savings: None,
        });
    }

    EfficiencyReport {
        score: round_to(score, 1),
        grade: grade_for_score(score).to_string(),
        analysis: format!("Analysis based on {total_requests} request records"),
        suggestions,
        positive_points,
        metrics: Some(EfficiencyMetrics {
            total_requests,
            total_cost: round_to(total_cost, 2),
            avg_cost_per_request: round_to(avg_cost, 4),
            model_distribution,
            unique_prompts,
        }),
    }
}
