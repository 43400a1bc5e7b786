use chrono::Utc;
use watchdog_app::services::{FeedbackInput, PricingList, PurgeSummary};
use watchdog_app::{AppError, CacheStats, RangeParams, Result};
use watchdog_core::{EfficiencyReport, ProjectStats, ProjectSummary};

use crate::{
    AppContext, CacheInvalidateRequest, EfficiencyRequest, FeedbackRequest, FeedbackResponse,
    HealthResponse, InvalidatedResponse, ProjectRequest, ProjectStatsRequest, WarningsRequest,
    WarningsResponse,
};

fn require_project(project_id: &str) -> Result<&str> {
    let trimmed = project_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("project_id is required".to_string()));
    }
    Ok(trimmed)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub fn health(ctx: &AppContext) -> HealthResponse {
    let database = match ctx.app_state.open_db() {
        Ok(_) => "connected",
        Err(_) => "unavailable",
    };
    HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        database,
    }
}

pub fn projects_list(ctx: &AppContext) -> Result<Vec<ProjectSummary>> {
    ctx.app_state.services.projects.list()
}

pub fn project_stats(ctx: &AppContext, req: ProjectStatsRequest) -> Result<ProjectStats> {
    let project_id = require_project(&req.project_id)?;
    let range = watchdog_app::resolve_range(
        &RangeParams {
            range: req.range,
            start: req.start,
            end: req.end,
        },
        Utc::now(),
    )?;
    ctx.app_state.services.projects.stats(project_id, &range)
}

pub fn project_purge(ctx: &AppContext, req: ProjectRequest) -> Result<PurgeSummary> {
    ctx.app_state.services.projects.purge(&req.project_id)
}

pub fn efficiency(ctx: &AppContext, req: EfficiencyRequest) -> Result<EfficiencyReport> {
    let project_id = require_project(&req.project_id)?;
    ctx.app_state
        .services
        .efficiency
        .report(project_id, req.range.as_deref(), req.no_cache)
}

pub fn cache_stats(ctx: &AppContext) -> CacheStats {
    ctx.app_state.services.efficiency.cache_stats()
}

pub fn cache_invalidate(ctx: &AppContext, req: CacheInvalidateRequest) -> InvalidatedResponse {
    let project_id = non_empty(req.project_id);
    let range = non_empty(req.range);
    let invalidated = ctx
        .app_state
        .services
        .efficiency
        .invalidate(project_id.as_deref(), range.as_deref());
    let message = match (project_id, range) {
        (None, _) => "All cache entries invalidated".to_string(),
        (Some(project_id), None) => format!("Cache invalidated for project: {project_id}"),
        (Some(project_id), Some(range)) => {
            format!("Cache invalidated for project: {project_id}, range: {range}")
        }
    };
    InvalidatedResponse {
        invalidated,
        message,
    }
}

pub fn pricing_list(ctx: &AppContext) -> PricingList {
    ctx.app_state.services.pricing.list()
}

pub fn warnings(ctx: &AppContext, req: WarningsRequest) -> Result<WarningsResponse> {
    let project_id = non_empty(req.project_id);
    let warnings = ctx
        .app_state
        .services
        .projects
        .warnings(project_id.as_deref())?;
    Ok(WarningsResponse {
        total_count: warnings.len(),
        warnings,
        time_range: "last_24_hours",
    })
}

pub fn feedback(ctx: &AppContext, req: FeedbackRequest) -> Result<FeedbackResponse> {
    let record = ctx.app_state.services.projects.feedback(FeedbackInput {
        request_id: req.request_id,
        project_id: req.project_id,
        is_accurate: req.is_accurate,
        message: req.message,
    })?;
    Ok(FeedbackResponse {
        id: record.id,
        project_id: record.project_id,
        message: "Thank you for your feedback.",
    })
}
