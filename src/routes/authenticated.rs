use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the authentication `route_layer` installed in
/// `create_router`, so each handler receives a validated `AuthUser`. Whether that user
/// may act on the specific course, content or comment is decided in `engine`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/me", get(handlers::get_me))
        // POST /upload/presigned
        // Short-lived upload URL for a course image; the returned key becomes `image_key`.
        .route("/upload/presigned", post(handlers::get_presigned_url))
        // --- Courses ---
        // POST /courses            any authenticated user; caller becomes the teacher.
        // POST /courses/{id}       teacher-only update.
        .route("/courses", post(handlers::create_course))
        .route("/courses/{id}", post(handlers::update_course))
        // POST /courses/{id}/enroll
        // Idempotent get-or-create of the caller's member row.
        .route("/courses/{id}/enroll", post(handlers::enroll_course))
        // POST /courses/{id}/contents   teacher-only.
        .route("/courses/{id}/contents", post(handlers::create_content))
        // --- Comments ---
        // POST /contents/{id}/comments  members of the content's course only.
        .route("/contents/{id}/comments", post(handlers::create_comment))
        // DELETE /comments/{id}         comment author only.
        .route("/comments/{id}", delete(handlers::delete_comment))
}
