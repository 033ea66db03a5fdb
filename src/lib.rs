use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod repository;
pub mod storage;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::LmsError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::hello, handlers::sign_up, handlers::sign_in, handlers::get_me,
        handlers::list_courses, handlers::get_course, handlers::create_course,
        handlers::update_course, handlers::enroll_course, handlers::create_content,
        handlers::list_comments, handlers::get_comment, handlers::create_comment,
        handlers::delete_comment, handlers::get_presigned_url
    ),
    components(
        schemas(
            models::User, models::Course, models::CourseMember, models::MemberRole,
            models::CourseContent, models::Comment, models::CourseForm,
            models::CreateContentRequest, models::CreateCommentRequest,
            models::CredentialsRequest, models::CoursePage, models::EnrollResponse,
            models::DeleteResponse, models::TokenResponse, models::PresignedUrlRequest,
            models::PresignedUrlResponse, models::HelloResponse, error::ErrorBody,
        )
    ),
    tags(
        (name = "course-portal", description = "Course, enrollment and comment API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single application context built once in `main` and cloned into every request.
/// There is no other process-wide state.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Object storage for course images.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors (notably `AuthUser`) pull only the parts of the state they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Extracting `AuthUser` rejects the request with 401
/// before any handler runs; on success the request continues unchanged.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, the authentication layer, the observability layers and
/// the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // Request id is set first so the trace span and the response both carry it.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One `http_request` span per request, tagged with method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
