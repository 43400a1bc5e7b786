use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::ORIGIN},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{errors::HttpError, state::HttpState};

pub const TOKEN_HEADER: &str = "x-watchdog-token";

pub async fn require_token(
    State(state): State<HttpState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, HttpError> {
    if let Some(origin) = req.headers().get(ORIGIN) {
        let origin = origin.to_str().map_err(|_| {
            HttpError::new(
                StatusCode::BAD_REQUEST,
                "invalid Origin header",
                Some("invalid_origin".to_string()),
            )
        })?;
        if !is_loopback_origin(origin) {
            debug!(origin, "rejected dashboard call from foreign origin");
            return Err(HttpError::new(
                StatusCode::FORBIDDEN,
                "invalid origin",
                Some("invalid_origin".to_string()),
            ));
        }
    }

    let token = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if token != Some(state.api_token.as_str()) {
        return Err(HttpError::new(
            StatusCode::UNAUTHORIZED,
            "missing or invalid API token",
            Some("token_invalid".to_string()),
        ));
    }

    Ok(next.run(req).await)
}

fn is_loopback_origin(origin: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        origin.strip_prefix(scheme).is_some_and(|host| {
            ["127.0.0.1", "localhost", "[::1]"]
                .iter()
                .any(|loopback| host == *loopback || host.starts_with(&format!("{loopback}:")))
        })
    })
}
