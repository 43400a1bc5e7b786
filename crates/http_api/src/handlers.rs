use axum::{
    extract::{Json, State},
    response::IntoResponse,
};

use app_api::{
    CacheInvalidateRequest, EfficiencyRequest, EmptyRequest, FeedbackRequest, ProjectRequest,
    ProjectStatsRequest, WarningsRequest,
};

use crate::{errors::HttpError, state::HttpState};

pub async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    Json(app_api::health(&state.context))
}

pub async fn projects_list(
    State(state): State<HttpState>,
    Json(_): Json<EmptyRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::projects_list(&state.context)?;
    Ok(Json(response))
}

pub async fn project_stats(
    State(state): State<HttpState>,
    Json(req): Json<ProjectStatsRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::project_stats(&state.context, req)?;
    Ok(Json(response))
}

pub async fn project_purge(
    State(state): State<HttpState>,
    Json(req): Json<ProjectRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::project_purge(&state.context, req)?;
    Ok(Json(response))
}

pub async fn efficiency(
    State(state): State<HttpState>,
    Json(req): Json<EfficiencyRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::efficiency(&state.context, req)?;
    Ok(Json(response))
}

pub async fn cache_stats(
    State(state): State<HttpState>,
    Json(_): Json<EmptyRequest>,
) -> impl IntoResponse {
    Json(app_api::cache_stats(&state.context))
}

pub async fn cache_invalidate(
    State(state): State<HttpState>,
    Json(req): Json<CacheInvalidateRequest>,
) -> impl IntoResponse {
    Json(app_api::cache_invalidate(&state.context, req))
}

pub async fn pricing_list(
    State(state): State<HttpState>,
    Json(_): Json<EmptyRequest>,
) -> impl IntoResponse {
    Json(app_api::pricing_list(&state.context))
}

pub async fn warnings(
    State(state): State<HttpState>,
    Json(req): Json<WarningsRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::warnings(&state.context, req)?;
    Ok(Json(response))
}

pub async fn feedback(
    State(state): State<HttpState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = app_api::feedback(&state.context, req)?;
    Ok(Json(response))
}
