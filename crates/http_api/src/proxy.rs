use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, warn};
use watchdog_app::services::{Assessment, DEFAULT_PROJECT_ID, ProxyRequest};
use watchdog_app::{AppError, Provider};

use crate::{errors::HttpError, state::HttpState};

pub const PROJECT_HEADER: &str = "x-project-id";
pub const PROVIDER_HEADER: &str = "x-upstream-provider";

/// OpenAI-compatible entry point. Errors use the chat-completion error shape
/// instead of the dashboard one.
pub async fn chat_completions(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match forward(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => HttpError::from(err).into_completion_response(),
    }
}

async fn forward(
    state: &HttpState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, AppError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|err| AppError::InvalidInput(format!("invalid JSON body: {err}")))?;
    let project_id = header_str(headers, PROJECT_HEADER).unwrap_or(DEFAULT_PROJECT_ID);
    let provider = provider_from(header_str(headers, PROVIDER_HEADER));
    let authorization = header_str(headers, AUTHORIZATION.as_str()).map(str::to_string);
    debug!(project_id, provider = provider.as_str(), "proxying chat completion");

    let response = state
        .context
        .app_state
        .services
        .proxy
        .forward(ProxyRequest {
            project_id: project_id.to_string(),
            provider,
            authorization,
            body,
        })
        .await?;

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut http_response = (status, Json(response.body)).into_response();
    if let Some(assessment) = &response.assessment {
        advisor_headers(http_response.headers_mut(), assessment);
    }
    Ok(http_response)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Unknown providers fall back to OpenAI.
fn provider_from(value: Option<&str>) -> Provider {
    match value {
        Some(value) => Provider::parse(value).unwrap_or_else(|| {
            warn!(provider = value, "unknown upstream provider, using openai");
            Provider::default()
        }),
        None => Provider::default(),
    }
}

fn advisor_headers(headers: &mut HeaderMap, assessment: &Assessment) {
    let values = [
        ("x-advisor-message", assessment.message.clone()),
        ("x-advisor-level", assessment.level.to_string()),
        ("x-total-cost-usd", assessment.cost_usd.to_string()),
        ("x-total-cost-cny", assessment.cost_cny.to_string()),
        (
            "x-similarity-score",
            assessment.details.similarity.to_string(),
        ),
    ];
    for (name, value) in values {
        // Messages can contain characters a header cannot carry; the body
        // still has them.
        if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
