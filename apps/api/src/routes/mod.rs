pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::limit::GlobalConcurrencyLimitLayer;

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // One shared semaphore across connection-level router clones.
    let concurrency = GlobalConcurrencyLimitLayer::new(state.config.max_concurrent_requests);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .route("/api/v1/analyze/text", post(handlers::handle_analyze_text))
        .route("/api/v1/optimize", post(handlers::handle_optimize))
        .route("/api/v1/config", get(handlers::handle_config))
        .layer(body_limit)
        .layer(concurrency)
        .with_state(state)
}
