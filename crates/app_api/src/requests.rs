use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct EmptyRequest {}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectStatsRequest {
    pub project_id: String,
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EfficiencyRequest {
    pub project_id: String,
    pub range: Option<String>,
    #[serde(default)]
    pub no_cache: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct CacheInvalidateRequest {
    pub project_id: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WarningsRequest {
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub request_id: String,
    pub project_id: Option<String>,
    #[serde(default = "default_accurate")]
    pub is_accurate: bool,
    pub message: Option<String>,
}

fn default_accurate() -> bool {
    true
}
