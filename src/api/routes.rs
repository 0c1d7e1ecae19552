use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for the text fields and multipart framing around the image.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.uploads.max_size as usize + FORM_OVERHEAD;

    let events = Router::new()
        .route("/events", get(handlers::query_events))
        .route(
            "/events",
            post(handlers::create_event).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/events/:id",
            put(handlers::update_event).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/events/:id", delete(handlers::delete_event));

    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/uploads/*name", get(handlers::serve_upload))
        .route("/_internal/health", get(handlers::health));

    let base_path = state.config.server.base_path.trim_end_matches('/');
    let router = if base_path.is_empty() {
        router.merge(events)
    } else {
        router.nest(base_path, events)
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
