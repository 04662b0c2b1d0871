use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Uploads
        .route(
            "/video-recorder/upload",
            post(handlers::upload_user_recording),
        )
        .route(
            "/video-recorder/workspaces/:workspace_id/upload",
            post(handlers::upload_workspace_recording),
        )
        .route("/video-recorder/resources", get(handlers::list_resources))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
