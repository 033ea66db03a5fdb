use crate::{
    AppState,
    auth::{self, AuthUser},
    engine,
    error::{ErrorBody, LmsError},
    extract::{Json, Path, Query},
    models::{
        Comment, Course, CourseContent, CourseForm, CoursePage, CreateCommentRequest,
        CreateContentRequest, CredentialsRequest, DeleteResponse, EnrollResponse, HelloResponse,
        PageParams, PresignedUrlRequest, PresignedUrlResponse, TokenResponse, User,
    },
    storage,
};
use axum::{extract::State, http::StatusCode};

// --- Public Handlers ---

/// hello
///
/// [Public Route] Liveness greeting kept for API compatibility.
#[utoipa::path(
    get,
    path = "/hello",
    responses((status = 200, description = "Greeting", body = HelloResponse))
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        msg: "Hello World".to_string(),
    })
}

/// sign_up
///
/// [Public Route] Creates a username/password identity.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Invalid credentials", body = ErrorBody),
        (status = 409, description = "Username taken", body = ErrorBody)
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<User>), LmsError> {
    let user = auth::sign_up(state.repo.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// sign_in
///
/// [Public Route] Exchanges credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, LmsError> {
    let token = auth::sign_in(state.repo.as_ref(), &state.config, payload).await?;
    Ok(Json(token))
}

/// list_courses
///
/// [Public Route] Page-number paginated course listing.
#[utoipa::path(
    get,
    path = "/courses",
    params(PageParams),
    responses((status = 200, description = "One page of courses", body = CoursePage))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<CoursePage>, LmsError> {
    Ok(Json(engine::list_courses(state.repo.as_ref(), params).await?))
}

/// get_course
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = Course),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Course>, LmsError> {
    Ok(Json(engine::get_course(state.repo.as_ref(), id).await?))
}

/// list_comments
///
/// [Public Route] All comments on a content item, oldest first.
#[utoipa::path(
    get,
    path = "/contents/{id}/comments",
    params(("id" = i64, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Content Not Found", body = ErrorBody)
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(content_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, LmsError> {
    Ok(Json(engine::list_comments(state.repo.as_ref(), content_id).await?))
}

/// get_comment
#[utoipa::path(
    get,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = Comment),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Comment>, LmsError> {
    Ok(Json(engine::get_comment(state.repo.as_ref(), id).await?))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The identity resolved from the bearer token.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(AuthUser { id, username }: AuthUser) -> Json<User> {
    Json(User { id, username })
}

/// create_course
///
/// [Authenticated Route] The caller becomes the teacher of the new course.
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CourseForm,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Invalid", body = ErrorBody),
        (status = 401, description = "Unauthenticated", body = ErrorBody)
    )
)]
pub async fn create_course(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseForm>,
) -> Result<(StatusCode, Json<Course>), LmsError> {
    let course = engine::create_course(state.repo.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// update_course
///
/// [Authenticated Route] Teacher-only overwrite of name/description/price (and image).
#[utoipa::path(
    post,
    path = "/courses/{id}",
    params(("id" = i64, Path, description = "Course ID")),
    request_body = CourseForm,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 403, description = "Not the teacher", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_course(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CourseForm>,
) -> Result<Json<Course>, LmsError> {
    let course = engine::update_course(state.repo.as_ref(), &caller, id, payload).await?;
    Ok(Json(course))
}

/// enroll_course
///
/// [Authenticated Route] Idempotent: 200 on first and repeated enrollment.
#[utoipa::path(
    post,
    path = "/courses/{id}/enroll",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrolled", body = EnrollResponse),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn enroll_course(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EnrollResponse>, LmsError> {
    let enrollment = engine::enroll(state.repo.as_ref(), &caller, id).await?;
    Ok(Json(enrollment.into()))
}

/// create_content
///
/// [Authenticated Route] Teacher-only.
#[utoipa::path(
    post,
    path = "/courses/{id}/contents",
    params(("id" = i64, Path, description = "Course ID")),
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Created", body = CourseContent),
        (status = 403, description = "Not the teacher", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn create_content(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<(StatusCode, Json<CourseContent>), LmsError> {
    let content = engine::create_content(state.repo.as_ref(), &caller, course_id, payload).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

/// create_comment
///
/// [Authenticated Route] Only members of the content's course may comment.
#[utoipa::path(
    post,
    path = "/contents/{id}/comments",
    params(("id" = i64, Path, description = "Content ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 403, description = "Not enrolled", body = ErrorBody),
        (status = 404, description = "Content Not Found", body = ErrorBody)
    )
)]
pub async fn create_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(content_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), LmsError> {
    let comment =
        engine::create_comment(state.repo.as_ref(), &caller, content_id, payload.comment).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// delete_comment
///
/// [Authenticated Route] Author-only hard delete.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, LmsError> {
    engine::delete_comment(state.repo.as_ref(), &caller, id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}

/// get_presigned_url
///
/// [Authenticated Route] Issues a 10-minute upload URL for a course image. The returned
/// `resource_key` is what clients pass as `image_key`.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses((status = 200, description = "URL", body = PresignedUrlResponse))
)]
pub async fn get_presigned_url(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, LmsError> {
    let object_key = storage::course_image_key(&payload.filename);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(|e| LmsError::Internal(e.to_string()))?;

    tracing::debug!(%user_id, key = %object_key, "issued presigned upload url");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
