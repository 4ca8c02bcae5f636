pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::require_auth;
use crate::creations::handlers as creations;
use crate::errors::AppError;
use crate::generation::handlers as generation;
use crate::state::AppState;

/// Large enough that a resume just over the 5 MiB limit reaches the handler
/// and gets the specific size error instead of a generic 413.
const MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let ai = Router::new()
        .route(
            "/generate-article",
            post(generation::handle_generate_article),
        )
        .route(
            "/generate-blog-title",
            post(generation::handle_generate_blog_title),
        )
        .route("/generate-image", post(generation::handle_generate_image))
        .route(
            "/remove-image-background",
            post(generation::handle_remove_background),
        )
        .route(
            "/remove-image-object",
            post(generation::handle_remove_object),
        )
        .route("/resume-review", post(generation::handle_review_resume));

    let user = Router::new()
        .route(
            "/get-user-creations",
            get(creations::handle_get_user_creations),
        )
        .route(
            "/get-published-creations",
            get(creations::handle_get_published_creations),
        )
        .route(
            "/toggle-like-creations",
            post(creations::handle_toggle_like),
        );

    let api = Router::new()
        .nest("/api/ai", ai)
        .nest("/api/user", user)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}
