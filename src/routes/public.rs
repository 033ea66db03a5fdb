use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no credential: health checks, the identity entry points and
/// read-only views of courses and comments.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer / monitoring health check.
        .route("/health", get(|| async { "ok" }))
        .route("/hello", get(handlers::hello))
        // POST /auth/sign-up, POST /auth/sign-in
        // Identity entry points; sign-in issues the bearer token used everywhere else.
        .route("/auth/sign-up", post(handlers::sign_up))
        .route("/auth/sign-in", post(handlers::sign_in))
        // GET /courses?page=&page_size=
        .route("/courses", get(handlers::list_courses))
        .route("/courses/{id}", get(handlers::get_course))
        // GET /contents/{id}/comments
        // Comment thread of one content item.
        .route("/contents/{id}/comments", get(handlers::list_comments))
        .route("/comments/{id}", get(handlers::get_comment))
}
