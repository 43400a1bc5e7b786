pub mod advisor;
pub mod analyzer;
pub mod classify;
pub mod efficiency;
pub mod fingerprint;
pub mod pricing;
pub mod progress;
pub mod ratelimit;
pub mod similarity;
pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use advisor::{AdviceContext, Advisor, EquivalentPrices, Equivalents, FormatError};
pub use analyzer::{AnalyzerConfig, BehaviorAnalyzer, ModelProfile};
pub use classify::{TaskType, contains_debug_keyword, detect_task_type, emotion_score};
pub use efficiency::{EfficiencyReport, EfficiencySuggestion, compute_efficiency};
pub use fingerprint::{FingerprintMethod, PromptFingerprint};
pub use pricing::{ModelPrice, PricingTable};
pub use progress::{ProgressSample, assess_progress};
pub use ratelimit::{RateDecision, RateLimitPolicy, rolling_cost};
pub use similarity::{similarity, topic_drift};
pub use store::{MemoryStore, RequestStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Completion tokens produced per prompt token; 0 when there was no prompt.
    pub fn efficiency(&self) -> f64 {
        if self.prompt_tokens == 0 {
            return 0.0;
        }
        self.completion_tokens as f64 / self.prompt_tokens as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Progress {
    Stuck,
    Exploring,
    Refining,
}

impl Progress {
    pub fn as_str(&self) -> &'static str {
        match self {
            Progress::Stuck => "stuck",
            Progress::Exploring => "exploring",
            Progress::Refining => "refining",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stuck" => Some(Progress::Stuck),
            "exploring" => Some(Progress::Exploring),
            "refining" => Some(Progress::Refining),
            _ => None,
        }
    }
}

/// One accepted proxied call. Records are append-only; a project purge is the
/// only way they disappear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub ts: String,
    pub project_id: String,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub total_cost_usd: f64,
    pub similarity_score: f64,
    pub pattern_score: i32,
    pub advisor_level: u8,
    pub prompt_fingerprint: Option<String>,
    pub progress: Option<Progress>,
    pub token_efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub similarity: f64,
    pub topic_drift: f64,
    pub emotion_score: i32,
    pub progress: Progress,
    pub task_type: TaskType,
    pub repeat_count: u32,
    pub similar_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub level: u8,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub details: AnalysisDetails,
}

impl AnalysisResult {
    /// Level-0 result used when history could not be read.
    pub fn neutral() -> Self {
        Self {
            level: 0,
            confidence: 0.0,
            reasons: Vec::new(),
            details: AnalysisDetails {
                similarity: 0.0,
                topic_drift: 0.0,
                emotion_score: 0,
                progress: Progress::Exploring,
                task_type: TaskType::Exploration,
                repeat_count: 0,
                similar_count: 0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub request_count: u64,
    pub total_cost_usd: f64,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub project_id: String,
    pub range: TimeRange,
    pub request_count: u64,
    pub total_cost_usd: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub avg_similarity: Option<f64>,
    pub avg_token_efficiency: Option<f64>,
    /// Requests per advisor level.
    pub level_counts: BTreeMap<u8, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub request_id: String,
    pub project_id: String,
    pub is_accurate: bool,
    pub message: Option<String>,
    pub ts: String,
}

/// Returns the content of the last message sent with the `user` role.
pub fn last_user_message(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|message| message.role == "user")
        .map(|message| message.content.as_str())
        .unwrap_or("")
}

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn model_matches_pattern(model: &str, pattern: &str) -> bool {
    let model = model.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return model == pattern;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut remainder = model.as_str();
    let mut first = true;
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if let Some(index) = remainder.find(part) {
            if first && index != 0 {
                return false;
            }
            remainder = &remainder[index + part.len()..];
            first = false;
        } else {
            return false;
        }
    }
    if pattern.ends_with('*') {
        true
    } else {
        remainder.is_empty()
    }
}
