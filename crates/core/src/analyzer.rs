//! Behavior analysis over a project's recent history.
//!
//! Each signal (similarity to earlier prompts, topic drift, emotion, progress,
//! repetition) contributes an additive score; the total maps onto an advisor
//! level and every contributing signal leaves a reason behind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{contains_debug_keyword, detect_task_type, emotion_score};
use crate::fingerprint::PromptFingerprint;
use crate::progress::{ProgressSample, assess_progress};
use crate::similarity::inverted_mean;
use crate::store::{RequestStore, StoreError};
use crate::{
    AnalysisDetails, AnalysisResult, ChatMessage, Progress, RequestRecord, last_user_message,
};

const FALLBACK_SIMILARITY_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub similarity_threshold: f64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub history_limit: usize,
    /// Pairs at or above this similarity count as repeats.
    pub similar_threshold: f64,
    pub default_model: String,
    pub model_profiles: BTreeMap<String, ModelProfile>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let model_profiles = [
            ("claude-opus-4", 0.90, 2),
            ("claude-sonnet-4", 0.85, 3),
            ("claude-haiku-3", 0.80, 4),
            ("gpt-4o", 0.75, 4),
            ("gpt-4o-mini", 0.70, 5),
            ("o1-preview", 0.80, 3),
            ("o1-mini", 0.75, 4),
        ]
        .into_iter()
        .map(|(model, similarity_threshold, max_retries)| {
            (
                model.to_string(),
                ModelProfile {
                    similarity_threshold,
                    max_retries,
                },
            )
        })
        .collect();
        Self {
            history_limit: 5,
            similar_threshold: 0.6,
            default_model: "gpt-4o".to_string(),
            model_profiles,
        }
    }
}

impl AnalyzerConfig {
    /// Exact name, then the longest configured name the model starts with
    /// (dated snapshots), then the default model.
    pub fn profile_for(&self, model: &str) -> Option<ModelProfile> {
        if let Some(profile) = self.model_profiles.get(model) {
            return Some(*profile);
        }
        let prefixed = self
            .model_profiles
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, profile)| *profile);
        prefixed.or_else(|| self.model_profiles.get(&self.default_model).copied())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BehaviorAnalyzer {
    config: AnalyzerConfig,
}

impl BehaviorAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Reads the project's recent history from `store` and scores the
    /// current conversation against it.
    pub fn analyze<S: RequestStore + ?Sized>(
        &self,
        store: &S,
        project_id: &str,
        messages: &[ChatMessage],
        model: &str,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult, StoreError> {
        let history = store.query_recent(project_id, self.config.history_limit)?;
        Ok(self.analyze_history(&history, messages, model, now))
    }

    /// `history` is newest first and must belong to a single project.
    pub fn analyze_history(
        &self,
        history: &[RequestRecord],
        messages: &[ChatMessage],
        model: &str,
        now: DateTime<Utc>,
    ) -> AnalysisResult {
        let subject = last_user_message(messages);
        let stored: Vec<Option<PromptFingerprint>> = history
            .iter()
            .map(|record| {
                record
                    .prompt_fingerprint
                    .as_deref()
                    .map(PromptFingerprint::decode)
            })
            .collect();

        let scores: Vec<f64> = stored
            .iter()
            .flatten()
            .map(|fingerprint| fingerprint.similarity_to(subject))
            .collect();
        let max_similarity = scores.iter().copied().fold(0.0, f64::max).clamp(0.0, 1.0);
        let similar_count = scores
            .iter()
            .filter(|score| **score > self.config.similar_threshold)
            .count() as u32;

        let topic_drift = self.topic_drift(&stored, subject);
        let emotion = emotion_score(subject);
        let progress = assess_progress(&ProgressSample::neutral(now), history);
        let texts: Vec<&str> = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect();
        let task_type = detect_task_type(&texts);
        let profile = self.config.profile_for(model);
        let threshold = profile
            .map(|profile| profile.similarity_threshold)
            .unwrap_or(FALLBACK_SIMILARITY_THRESHOLD);
        let max_allowed = profile
            .map(|profile| profile.max_retries)
            .unwrap_or_else(|| task_type.allowed_iterations());
        let repeat_count = self.repeat_count(&stored, subject);

        let mut score: i32 = 0;
        let mut reasons = Vec::new();
        if max_similarity > threshold {
            score += 30;
            reasons.push(format!(
                "high similarity ({:.0}%)",
                max_similarity * 100.0
            ));
        }
        if similar_count >= 2 {
            score += 15 * (similar_count as i32 - 1);
            reasons.push(format!("multiple similar requests ({similar_count})"));
        }
        if topic_drift < 0.3 {
            score += 20;
            reasons.push("low topic drift".to_string());
        } else {
            score -= 15;
        }
        if emotion > 3 {
            score += 30;
            reasons.push("frustration detected".to_string());
        } else if emotion < 0 {
            score -= 15;
        }
        match progress {
            Progress::Stuck => {
                score += 35;
                reasons.push("no progress".to_string());
            }
            Progress::Exploring => score -= 20,
            Progress::Refining => {}
        }
        if repeat_count > max_allowed {
            score += 25 * (repeat_count - max_allowed) as i32;
            reasons.push(format!("exceeded {model} iteration limit ({max_allowed})"));
        }
        if repeat_count >= 2 && contains_debug_keyword(subject) {
            score += 20;
            reasons.push("repeated debugging attempts".to_string());
        }

        AnalysisResult {
            level: level_for_score(score),
            confidence: (score as f64 / 100.0).clamp(0.0, 1.0),
            reasons,
            details: AnalysisDetails {
                similarity: max_similarity,
                topic_drift,
                emotion_score: emotion,
                progress,
                task_type,
                repeat_count,
                similar_count,
            },
        }
    }

    /// Drift across stored prompts (oldest first) followed by the subject.
    fn topic_drift(&self, stored: &[Option<PromptFingerprint>], subject: &str) -> f64 {
        let mut sequence: Vec<PromptFingerprint> =
            stored.iter().rev().flatten().cloned().collect();
        sequence.push(PromptFingerprint::Text(subject.to_string()));
        let scores: Vec<f64> = sequence
            .windows(2)
            .map(|pair| pair[0].similarity_between(&pair[1]))
            .collect();
        inverted_mean(&scores)
    }

    /// Length of the run of similar prompts ending at the subject, walking
    /// newest to oldest and stopping at the first dissimilar or unknown one.
    fn repeat_count(&self, stored: &[Option<PromptFingerprint>], subject: &str) -> u32 {
        let mut previous = PromptFingerprint::Text(subject.to_string());
        let mut count = 0;
        for fingerprint in stored {
            let Some(fingerprint) = fingerprint else {
                break;
            };
            if fingerprint.similarity_between(&previous) < self.config.similar_threshold {
                break;
            }
            count += 1;
            previous = fingerprint.clone();
        }
        count
    }
}

pub fn level_for_score(score: i32) -> u8 {
    if score >= 70 {
        3
    } else if score >= 40 {
        2
    } else if score >= 20 {
        1
    } else {
        0
    }
}
