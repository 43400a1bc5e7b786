mod errors;
mod handlers;
mod middleware;
mod proxy;
mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub use errors::HttpError;
pub use middleware::TOKEN_HEADER;
pub use proxy::{PROJECT_HEADER, PROVIDER_HEADER};
pub use state::{HttpState, generate_api_token};

pub fn router(state: HttpState) -> Router<()> {
    let api = Router::new()
        .route("/projects_list", post(handlers::projects_list))
        .route("/project_stats", post(handlers::project_stats))
        .route("/project_purge", post(handlers::project_purge))
        .route("/efficiency", post(handlers::efficiency))
        .route("/cache_stats", post(handlers::cache_stats))
        .route("/cache_invalidate", post(handlers::cache_invalidate))
        .route("/pricing_list", post(handlers::pricing_list))
        .route("/warnings", post(handlers::warnings))
        .route("/feedback", post(handlers::feedback))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/chat/completions", post(proxy::chat_completions))
        .nest("/api", api)
        .with_state(state)
}
