use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware::from_fn, Router};

use crate::handlers::dashboard_handlers::{
    analyze_images, analyze_text, digest, get_news, get_session, open_news, refresh_news, status,
};
use crate::handlers::draft_handlers::build_draft;
use crate::middleware::session_middleware::session_middleware;

/// Upload cap for `/vision`. Matches the generation service's inline request limit.
pub const VISION_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn dashboard_routes() -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/news", get(get_news))
        .route("/news/refresh", post(refresh_news))
        .route("/news/{rank}/open", post(open_news))
        .route("/session", get(get_session))
        .route("/analyze", post(analyze_text))
        .route("/digest", post(digest))
        .route(
            "/vision",
            post(analyze_images).layer(DefaultBodyLimit::max(VISION_BODY_LIMIT)),
        )
        .route("/draft", post(build_draft))
        .layer(from_fn(session_middleware))
}
