use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use course_portal::{
    AppConfig, AppState, InMemoryRepository, MockStorageService,
    auth::AuthUser,
    error::{ErrorBody, LmsError},
    extract::{Json, Path, Query},
    handlers,
    models::{
        Comment, Course, CourseContent, CourseForm, CourseMember, CreateCommentRequest,
        CreateContentRequest, Enrollment, MemberRole, PageParams, PresignedUrlRequest, User,
        UserCredentials,
    },
    repository::{RepoResult, Repository, RepositoryError, RepositoryState},
    storage::StorageState,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Mock Repository simulating an unavailable database ---

struct DownRepository;

fn down<T>() -> RepoResult<T> {
    Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Repository for DownRepository {
    async fn get_user(&self, _id: Uuid) -> RepoResult<Option<User>> {
        down()
    }
    async fn find_credentials(&self, _username: &str) -> RepoResult<Option<UserCredentials>> {
        down()
    }
    async fn create_user(&self, _username: &str, _hash: &str) -> RepoResult<User> {
        down()
    }
    async fn list_courses(&self, _limit: i64, _offset: i64) -> RepoResult<Vec<Course>> {
        down()
    }
    async fn count_courses(&self) -> RepoResult<i64> {
        down()
    }
    async fn get_course(&self, _id: i64) -> RepoResult<Option<Course>> {
        down()
    }
    async fn create_course(&self, _teacher_id: Uuid, _form: CourseForm) -> RepoResult<Course> {
        down()
    }
    async fn update_course(
        &self,
        _id: i64,
        _teacher_id: Uuid,
        _form: CourseForm,
    ) -> RepoResult<Option<Course>> {
        down()
    }
    async fn get_member(&self, _id: i64) -> RepoResult<Option<CourseMember>> {
        down()
    }
    async fn find_member(&self, _course_id: i64, _user_id: Uuid) -> RepoResult<Option<CourseMember>> {
        down()
    }
    async fn enroll(&self, _course_id: i64, _user_id: Uuid, _role: MemberRole) -> RepoResult<Enrollment> {
        down()
    }
    async fn get_content(&self, _id: i64) -> RepoResult<Option<CourseContent>> {
        down()
    }
    async fn create_content(
        &self,
        _course_id: i64,
        _req: CreateContentRequest,
    ) -> RepoResult<CourseContent> {
        down()
    }
    async fn get_comment(&self, _id: i64) -> RepoResult<Option<Comment>> {
        down()
    }
    async fn list_comments(&self, _content_id: i64) -> RepoResult<Vec<Comment>> {
        down()
    }
    async fn create_comment(
        &self,
        _content_id: i64,
        _member_id: i64,
        _text: String,
    ) -> RepoResult<Comment> {
        down()
    }
    async fn delete_comment(&self, _id: i64, _user_id: Uuid) -> RepoResult<bool> {
        down()
    }
}

// --- Helpers ---

fn state_with(repo: RepositoryState, storage: StorageState) -> AppState {
    AppState {
        repo,
        storage,
        config: AppConfig::default(),
    }
}

fn memory_state() -> (Arc<InMemoryRepository>, AppState) {
    let repo = Arc::new(InMemoryRepository::new());
    let state = state_with(repo.clone(), Arc::new(MockStorageService::new()));
    (repo, state)
}

async fn caller(repo: &InMemoryRepository, username: &str) -> AuthUser {
    repo.create_user(username, "unused-hash").await.unwrap().into()
}

async fn error_body(err: LmsError) -> (StatusCode, ErrorBody) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn course_form() -> CourseForm {
    CourseForm {
        name: "Rust 101".to_string(),
        description: "Borrowing and lifetimes".to_string(),
        price: 9000,
        image_key: None,
    }
}

// --- Tests ---

#[tokio::test]
async fn test_create_course_returns_created() {
    let (repo, state) = memory_state();
    let teacher = caller(&repo, "t1").await;

    let (status, Json(course)) =
        handlers::create_course(teacher.clone(), State(state), Json(course_form()))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(course.teacher_id, teacher.id);
}

#[tokio::test]
async fn test_get_course_not_found() {
    let (_, state) = memory_state();

    let err = handlers::get_course(State(state), Path(42)).await.unwrap_err();
    let (status, body) = error_body(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.code, "not_found");
    assert_eq!(body.error, "course not found");
}

#[tokio::test]
async fn test_enroll_course_reports_repeat() {
    let (repo, state) = memory_state();
    let teacher = caller(&repo, "t1").await;
    let student = caller(&repo, "s1").await;
    let (_, Json(course)) = handlers::create_course(teacher, State(state.clone()), Json(course_form()))
        .await
        .unwrap();

    let Json(first) = handlers::enroll_course(student.clone(), State(state.clone()), Path(course.id))
        .await
        .unwrap();
    let Json(second) = handlers::enroll_course(student, State(state), Path(course.id))
        .await
        .unwrap();

    assert_eq!(first.message, "Enrolled successfully");
    assert_eq!(second.message, "Already enrolled");
    assert_eq!(first.member.id, second.member.id);
}

#[tokio::test]
async fn test_comment_handlers_enforce_membership_and_authorship() {
    let (repo, state) = memory_state();
    let teacher = caller(&repo, "t1").await;
    let student = caller(&repo, "s1").await;
    let (_, Json(course)) =
        handlers::create_course(teacher.clone(), State(state.clone()), Json(course_form()))
            .await
            .unwrap();
    let (_, Json(content)) = handlers::create_content(
        teacher.clone(),
        State(state.clone()),
        Path(course.id),
        Json(CreateContentRequest {
            name: "Lifetimes".to_string(),
            description: String::new(),
        }),
    )
    .await
    .unwrap();

    let comment_req = || {
        Json(CreateCommentRequest {
            comment: "hi".to_string(),
        })
    };

    let err = handlers::create_comment(student.clone(), State(state.clone()), Path(content.id), comment_req())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    handlers::enroll_course(student.clone(), State(state.clone()), Path(course.id))
        .await
        .unwrap();
    let (status, Json(comment)) =
        handlers::create_comment(student.clone(), State(state.clone()), Path(content.id), comment_req())
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let err = handlers::delete_comment(teacher, State(state.clone()), Path(comment.id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let Json(deleted) = handlers::delete_comment(student, State(state.clone()), Path(comment.id))
        .await
        .unwrap();
    assert!(deleted.deleted);

    let Json(thread) = handlers::list_comments(State(state), Path(content.id)).await.unwrap();
    assert!(thread.is_empty());
}

#[tokio::test]
async fn test_database_failure_is_internal_without_detail() {
    let state = state_with(Arc::new(DownRepository), Arc::new(MockStorageService::new()));

    let err = handlers::list_courses(State(state), Query(PageParams::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::Internal(_)));

    let (status, body) = error_body(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.code, "internal");
    assert_eq!(body.error, "internal server error");
}

#[tokio::test]
async fn test_get_presigned_url_success() {
    let (repo, state) = memory_state();
    let teacher = caller(&repo, "t1").await;

    let Json(response) = handlers::get_presigned_url(
        teacher,
        State(state),
        Json(PresignedUrlRequest {
            filename: "syllabus.jpeg".to_string(),
            file_type: "image/jpeg".to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(response.resource_key.starts_with("courses/"));
    assert!(response.resource_key.ends_with(".jpeg"));
    assert!(response.upload_url.contains("signature=fake"));
}

#[tokio::test]
async fn test_get_presigned_url_storage_failure() {
    let repo = Arc::new(InMemoryRepository::new());
    let teacher = caller(&repo, "t1").await;
    let state = state_with(repo, Arc::new(MockStorageService::new_failing()));

    let err = handlers::get_presigned_url(
        teacher,
        State(state),
        Json(PresignedUrlRequest {
            filename: "cover.png".to_string(),
            file_type: "image/png".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
