use serde::Serialize;
use watchdog_app::services::Warning;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

#[derive(Serialize)]
pub struct WarningsResponse {
    pub warnings: Vec<Warning>,
    pub total_count: usize,
    pub time_range: &'static str,
}

#[derive(Serialize)]
pub struct InvalidatedResponse {
    pub invalidated: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub id: String,
    pub project_id: String,
    pub message: &'static str,
}
