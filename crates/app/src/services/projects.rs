use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use watchdog_core::{
    EquivalentPrices, FeedbackRecord, ProjectStats, ProjectSummary, RequestRecord, TimeRange,
    format_ts, round_to,
};
use watchdog_db::Db;

use crate::cache::EfficiencyCache;
use crate::error::{AppError, Result};
use crate::locks::ProjectLocks;
use crate::services::{SharedConfig, open_db};

const WARNING_MIN_LEVEL: u8 = 2;
const WARNING_WINDOW_HOURS: i64 = 24;
const WARNING_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurgeSummary {
    pub project_id: String,
    pub deleted_requests: u64,
    pub deleted_feedback: u64,
    pub invalidated_cache_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningDetails {
    pub cost_usd: f64,
    pub cost_cny: f64,
    pub similarity_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub id: String,
    pub timestamp: String,
    pub project_id: String,
    pub level: u8,
    pub message: String,
    pub details: WarningDetails,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedbackInput {
    pub request_id: String,
    pub project_id: Option<String>,
    pub is_accurate: bool,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct ProjectsService {
    config: SharedConfig,
    cache: EfficiencyCache,
    locks: ProjectLocks,
}

impl ProjectsService {
    pub(super) fn new(config: SharedConfig, cache: EfficiencyCache, locks: ProjectLocks) -> Self {
        Self {
            config,
            cache,
            locks,
        }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    pub fn list(&self) -> Result<Vec<ProjectSummary>> {
        Ok(self.db()?.list_projects()?)
    }

    pub fn stats(&self, project_id: &str, range: &TimeRange) -> Result<ProjectStats> {
        Ok(self.db()?.project_stats(project_id, range)?)
    }

    /// Deletes the project's records and feedback and drops its cached
    /// reports. Holds the project lock so no request lands mid-purge.
    pub fn purge(&self, project_id: &str) -> Result<PurgeSummary> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(AppError::InvalidInput("project_id is required".to_string()));
        }
        let counts = self.locks.with_lock(project_id, || -> Result<_> {
            let mut db = self.db()?;
            Ok(db.purge_project(project_id)?)
        })?;
        let invalidated = self.cache.invalidate(Some(project_id), None);
        info!(
            project_id,
            deleted_requests = counts.requests,
            deleted_feedback = counts.feedback,
            "project purged"
        );
        Ok(PurgeSummary {
            project_id: project_id.to_string(),
            deleted_requests: counts.requests,
            deleted_feedback: counts.feedback,
            invalidated_cache_entries: invalidated,
        })
    }

    /// Level 2+ requests from the last 24 hours, newest first.
    pub fn warnings(&self, project_id: Option<&str>) -> Result<Vec<Warning>> {
        let since = format_ts(Utc::now() - Duration::hours(WARNING_WINDOW_HOURS));
        let records =
            self.db()?
                .warnings(project_id, WARNING_MIN_LEVEL, &since, WARNING_LIMIT)?;
        let prices = self.config.settings.pricing.equivalent_prices();
        let cooldown_seconds = self.config.settings.advisor.rate_limit_policy().retry_after_seconds();
        Ok(records
            .iter()
            .map(|record| to_warning(record, &prices, cooldown_seconds))
            .collect())
    }

    pub fn feedback(&self, input: FeedbackInput) -> Result<FeedbackRecord> {
        let request_id = input.request_id.trim();
        if request_id.is_empty() {
            return Err(AppError::InvalidInput("request_id is required".to_string()));
        }
        let db = self.db()?;
        let project_id = match input.project_id.as_deref().map(str::trim) {
            Some(project_id) if !project_id.is_empty() => project_id.to_string(),
            _ => db
                .get_request(request_id)?
                .map(|record| record.project_id)
                .unwrap_or_else(|| "unknown".to_string()),
        };
        let record = FeedbackRecord {
            id: format!("{:032x}", rand::thread_rng().r#gen::<u128>()),
            request_id: request_id.to_string(),
            project_id,
            is_accurate: input.is_accurate,
            message: input.message.filter(|message| !message.trim().is_empty()),
            ts: format_ts(Utc::now()),
        };
        db.insert_feedback(&record)?;
        Ok(record)
    }
}

fn warning_message(level: u8) -> &'static str {
    match level {
        2 => "Similar requests detected. Consider optimizing.",
        3 => "High similarity detected. Review your approach.",
        _ => "Rate limiting triggered due to high consumption.",
    }
}

fn to_warning(record: &RequestRecord, prices: &EquivalentPrices, cooldown_seconds: u64) -> Warning {
    Warning {
        id: record.id.clone(),
        timestamp: record.ts.clone(),
        project_id: record.project_id.clone(),
        level: record.advisor_level,
        message: warning_message(record.advisor_level).to_string(),
        details: WarningDetails {
            cost_usd: round_to(record.total_cost_usd, 2),
            cost_cny: round_to(prices.to_cny(record.total_cost_usd), 2),
            similarity_score: round_to(record.similarity_score, 2),
            cooldown_seconds: (record.advisor_level >= 4).then_some(cooldown_seconds),
        },
    }
}
