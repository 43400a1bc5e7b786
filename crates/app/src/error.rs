use serde::Serialize;
use thiserror::Error;

use crate::services::Cooldown;
use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("db error: {0}")]
    Db(#[from] watchdog_db::DbError),
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("{}", .0.message)]
    RateLimited(Box<Cooldown>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, code) = match &err {
            AppError::InvalidInput(_) => (400, Some("invalid_input")),
            AppError::NotFound(_) => (404, Some("not_found")),
            AppError::RateLimited(_) => (429, Some("rate_limit_exceeded")),
            AppError::Upstream(_) => (502, Some("upstream_error")),
            AppError::Db(_) | AppError::Io(_) | AppError::Serde(_) | AppError::Message(_) => {
                (500, None)
            }
        };
        let (retry_after, details) = match &err {
            AppError::RateLimited(cooldown) => (
                Some(cooldown.retry_after_seconds),
                serde_json::to_value(cooldown.as_ref()).ok(),
            ),
            _ => (None, None),
        };
        Self {
            status,
            message: err.to_string(),
            code: code.map(str::to_string),
            retry_after,
            details,
        }
    }
}
