use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};
use watchdog_core::ratelimit::cooldown_suggestions;
use watchdog_core::{
    AdviceContext, Advisor, AnalysisDetails, AnalysisResult, BehaviorAnalyzer, ChatMessage,
    Equivalents, FingerprintMethod, PricingTable, PromptFingerprint, RateDecision,
    RateLimitPolicy, RequestRecord, TokenUsage, format_ts, last_user_message, parse_ts,
    rolling_cost,
};

use crate::error::{AppError, Result};
use crate::locks::ProjectLocks;
use crate::services::{SharedConfig, open_db};
use crate::upstream::Provider;

/// The parts of a proxied call the guard looks at.
#[derive(Debug, Clone, Copy)]
pub struct GuardRequest<'a> {
    pub project_id: &'a str,
    pub provider: Provider,
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub request_id: String,
    pub level: u8,
    pub confidence: f64,
    pub cost_usd: f64,
    pub cost_cny: f64,
    pub message: String,
    pub reasons: Vec<String>,
    pub details: AnalysisDetails,
    /// Hourly spend including this request.
    pub window_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cooldown {
    pub project_id: String,
    pub message: String,
    pub retry_after_seconds: u64,
    pub cost_usd: f64,
    pub cost_cny: f64,
    pub equivalents: Equivalents,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(Assessment),
    Rejected(Cooldown),
}

/// Behavior analysis, pricing and the hourly spend ceiling for proxied calls.
#[derive(Clone)]
pub struct GuardService {
    config: SharedConfig,
    analyzer: Arc<BehaviorAnalyzer>,
    pricing: Arc<PricingTable>,
    policy: RateLimitPolicy,
    advisor: Arc<Advisor>,
    fingerprint: FingerprintMethod,
    rng: Arc<Mutex<StdRng>>,
    locks: ProjectLocks,
}

impl GuardService {
    pub(super) fn new(config: SharedConfig, locks: ProjectLocks) -> Self {
        let settings = &config.settings;
        let analyzer = BehaviorAnalyzer::new(settings.analyzer.clone());
        let pricing = settings.pricing.table();
        let policy = settings.advisor.rate_limit_policy();
        let advisor = Advisor::new(settings.pricing.equivalent_prices());
        let fingerprint = settings.privacy.fingerprint_method();
        Self {
            config,
            analyzer: Arc::new(analyzer),
            pricing: Arc::new(pricing),
            policy,
            advisor: Arc::new(advisor),
            fingerprint,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            locks,
        }
    }

    /// Makes template choice and request ids reproducible.
    pub fn reseed(&self, seed: u64) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        *rng = StdRng::seed_from_u64(seed);
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Scores the conversation against the project's history. Storage
    /// problems degrade to a neutral result instead of failing the call.
    pub fn analyze(&self, request: &GuardRequest<'_>, now: DateTime<Utc>) -> AnalysisResult {
        let analysis = open_db(&self.config).and_then(|db| {
            self.analyzer
                .analyze(
                    &db,
                    request.project_id,
                    request.messages,
                    request.model,
                    now,
                )
                .map_err(|err| AppError::Message(err.to_string()))
        });
        match analysis {
            Ok(result) => {
                debug!(
                    project_id = request.project_id,
                    level = result.level,
                    similarity = result.details.similarity,
                    "analyzed request"
                );
                result
            }
            Err(err) => {
                warn!(project_id = request.project_id, error = %err, "analysis failed, using neutral result");
                AnalysisResult::neutral()
            }
        }
    }

    /// Rejects before any upstream call when the stored spend alone is over
    /// the ceiling.
    pub fn preflight(&self, project_id: &str, now: DateTime<Utc>) -> Result<()> {
        if !self.policy.enabled {
            return Ok(());
        }
        let db = open_db(&self.config)?;
        let since = format_ts(self.policy.window_start(now));
        let stored = db.window_cost(project_id, &since)?;
        if let RateDecision::Reject {
            window_cost_usd,
            retry_after_seconds,
        } = self.policy.evaluate(stored, 0.0)
        {
            info!(project_id, window_cost_usd, "project is cooling down");
            let cooldown = self.cooldown(project_id, window_cost_usd, retry_after_seconds, "");
            return Err(AppError::RateLimited(Box::new(cooldown)));
        }
        Ok(())
    }

    /// Prices the returned usage and applies the hourly ceiling. Accepted
    /// requests are recorded; rejected ones leave no trace.
    pub fn evaluate(
        &self,
        request: &GuardRequest<'_>,
        analysis: &AnalysisResult,
        usage: TokenUsage,
        now: DateTime<Utc>,
    ) -> Result<Verdict> {
        let cost_usd =
            self.pricing
                .cost_usd(request.model, usage.prompt_tokens, usage.completion_tokens);
        self.locks.with_lock(request.project_id, || {
            self.decide(request, analysis, usage, cost_usd, now)
        })
    }

    fn decide(
        &self,
        request: &GuardRequest<'_>,
        analysis: &AnalysisResult,
        usage: TokenUsage,
        cost_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<Verdict> {
        let db = open_db(&self.config)?;
        let since = format_ts(self.policy.window_start(now));
        let window = db.requests_since(request.project_id, &since)?;
        let stored = rolling_cost(&window);

        let (window_cost_usd, near_limit) = match self.policy.evaluate(stored, cost_usd) {
            RateDecision::Reject {
                window_cost_usd,
                retry_after_seconds,
            } => {
                warn!(
                    project_id = request.project_id,
                    window_cost_usd,
                    ceiling = self.policy.max_cost_per_hour_usd,
                    "hourly spend ceiling exceeded"
                );
                return Ok(Verdict::Rejected(self.cooldown(
                    request.project_id,
                    window_cost_usd,
                    retry_after_seconds,
                    request.model,
                )));
            }
            RateDecision::Allow {
                window_cost_usd,
                near_limit,
            } => (window_cost_usd, near_limit),
        };

        let mut level = analysis.level;
        if near_limit {
            level = level.max(3);
        }
        let record = RequestRecord {
            id: self.next_request_id(),
            ts: format_ts(now),
            project_id: request.project_id.to_string(),
            provider: request.provider.as_str().to_string(),
            model: request.model.to_string(),
            usage,
            total_cost_usd: cost_usd,
            similarity_score: analysis.details.similarity,
            pattern_score: analysis.details.emotion_score,
            advisor_level: level,
            prompt_fingerprint: self.fingerprint_for(request.messages),
            progress: Some(analysis.details.progress),
            token_efficiency: usage.efficiency(),
        };
        db.insert_request(&record)?;

        let message = self.message(&AdviceContext {
            level,
            cost_usd,
            model: request.model,
            repeat_count: analysis.details.repeat_count,
            similarity: analysis.details.similarity,
            time_spent_minutes: time_spent_minutes(&window, now),
        });
        info!(
            project_id = request.project_id,
            request_id = %record.id,
            level,
            cost_usd,
            window_cost_usd,
            "request accepted"
        );
        Ok(Verdict::Accepted(Assessment {
            request_id: record.id,
            level,
            confidence: analysis.confidence,
            cost_usd,
            cost_cny: self.advisor.prices().to_cny(cost_usd),
            message,
            reasons: analysis.reasons.clone(),
            details: analysis.details.clone(),
            window_cost_usd,
        }))
    }

    fn cooldown(
        &self,
        project_id: &str,
        window_cost_usd: f64,
        retry_after_seconds: u64,
        model: &str,
    ) -> Cooldown {
        let prices = self.advisor.prices();
        let cost_cny = prices.to_cny(window_cost_usd);
        let message = self.message(&AdviceContext {
            level: 4,
            cost_usd: window_cost_usd,
            model,
            repeat_count: 0,
            similarity: 0.0,
            time_spent_minutes: u64::from(self.policy.cooldown_minutes),
        });
        Cooldown {
            project_id: project_id.to_string(),
            message,
            retry_after_seconds,
            cost_usd: watchdog_core::round_to(window_cost_usd, 2),
            cost_cny: watchdog_core::round_to(cost_cny, 2),
            equivalents: prices.equivalents(cost_cny),
            suggestions: cooldown_suggestions(),
        }
    }

    fn message(&self, ctx: &AdviceContext<'_>) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.advisor.message(ctx, &mut *rng)
    }

    fn next_request_id(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        format!("{:032x}", rng.r#gen::<u128>())
    }

    fn fingerprint_for(&self, messages: &[ChatMessage]) -> Option<String> {
        let subject = last_user_message(messages);
        if subject.trim().is_empty() {
            return None;
        }
        Some(PromptFingerprint::compute(self.fingerprint, subject).encode())
    }
}

/// Minutes since the oldest request in the current window, at least one.
fn time_spent_minutes(window: &[RequestRecord], now: DateTime<Utc>) -> u64 {
    window
        .last()
        .and_then(|oldest| parse_ts(&oldest.ts))
        .map(|oldest| (now - oldest).num_minutes().max(1) as u64)
        .unwrap_or(1)
}
