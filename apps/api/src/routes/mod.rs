pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::avatar::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_avatar_bytes + MULTIPART_OVERHEAD;
    let uploads = ServeDir::new(&state.config.uploads_dir);

    Router::new()
        .route("/health", get(health::health_handler))
        // Avatar API
        .route(
            "/api/v1/avatars",
            post(handlers::handle_upload_avatar).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/v1/avatars/:filename",
            delete(handlers::handle_delete_avatar),
        )
        .nest_service("/uploads", uploads)
        .with_state(state)
}
