use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The public view of an identity stored in the `users` table.
/// Courses and memberships reference it by `id`; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// UserCredentials
///
/// Internal row carrying the Argon2 hash. Only the sign-in path reads it and it is
/// never serialized into a response.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl From<UserCredentials> for User {
    fn from(creds: UserCredentials) -> Self {
        User {
            id: creds.id,
            username: creds.username,
        }
    }
}

/// Course
///
/// A course record from the `courses` table. `teacher_id` is fixed at creation and
/// identifies the only user allowed to mutate the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub teacher_id: Uuid,
    // Storage key of the cover image, obtained through the presigned upload flow.
    pub image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// MemberRole
///
/// Role of a user inside one course. Stored as the short codes `std` / `asst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum MemberRole {
    #[default]
    #[serde(rename = "std")]
    Student,
    #[serde(rename = "asst")]
    Assistant,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Student => "std",
            MemberRole::Assistant => "asst",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown member role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for MemberRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "std" => Ok(MemberRole::Student),
            "asst" => Ok(MemberRole::Assistant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// Lets `#[sqlx(try_from = "String")]` decode the TEXT column.
impl TryFrom<String> for MemberRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// CourseMember
///
/// Enrollment row from `course_members`. There is at most one per (course, user)
/// and it is the authorship anchor for comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CourseMember {
    pub id: i64,
    pub course_id: i64,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: MemberRole,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// "<course> : <user>", by id.
impl fmt::Display for CourseMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.course_id, self.user_id)
    }
}

/// CourseContent
///
/// A unit of material belonging to exactly one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CourseContent {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A comment on course content. The author is reachable only through `member_id`,
/// which names a `CourseMember` of the content's course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub content_id: i64,
    pub member_id: i64,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Enrollment
///
/// Outcome of the insert-if-absent enrollment: the member row and whether this call
/// created it.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub member: CourseMember,
    pub created: bool,
}

// --- Request Payloads (Input Schemas) ---

/// CourseForm
///
/// Body of both `POST /courses` and `POST /courses/{id}`. `image_key` is the
/// `resource_key` returned by `/upload/presigned`; on update it only replaces the
/// stored image when present.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CourseForm {
    #[schema(example = "Django for Beginners")]
    pub name: String,
    pub description: String,
    #[schema(example = 9000)]
    pub price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
}

/// CreateContentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateContentRequest {
    pub name: String,
    pub description: String,
}

/// CreateCommentRequest
///
/// Input payload for posting a comment on a content item.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[schema(example = "This is a comment")]
    pub comment: String,
}

/// CredentialsRequest
///
/// Username/password pair accepted by both `/auth/sign-up` and `/auth/sign-in`.
/// The password is hashed or verified immediately and never stored or logged in clear.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for a course image.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.png")]
    pub filename: String,
    /// The MIME type the upload will be constrained to.
    #[schema(example = "image/png")]
    pub file_type: String,
}

/// PageParams
///
/// Page-number pagination for `GET /courses`.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Items per page, clamped to 1..=100 (default 100).
    pub page_size: Option<u32>,
}

impl PageParams {
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Resolves the parameters into a SQL `(limit, offset)` pair.
    pub fn window(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let size = self
            .page_size
            .unwrap_or(Self::MAX_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE);
        (i64::from(size), i64::from(page - 1) * i64::from(size))
    }
}

// --- Response Schemas (Output) ---

/// CoursePage
///
/// One page of the course listing plus the total number of courses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CoursePage {
    pub items: Vec<Course>,
    pub count: i64,
}

/// EnrollResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EnrollResponse {
    pub message: String,
    pub member: CourseMember,
    /// False when the caller was already enrolled.
    pub created: bool,
}

impl From<Enrollment> for EnrollResponse {
    fn from(enrollment: Enrollment) -> Self {
        let message = if enrollment.created {
            "Enrolled successfully"
        } else {
            "Already enrolled"
        };
        EnrollResponse {
            message: message.to_string(),
            member: enrollment.member,
            created: enrollment.created,
        }
    }
}

/// DeleteResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// TokenResponse
///
/// Bearer credential issued by `/auth/sign-in`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access: String,
    pub token_type: String,
    /// Lifetime of `access` in seconds.
    pub expires_in: u64,
}

/// PresignedUrlResponse
///
/// Output schema containing the temporary URL for client-to-storage transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to send back as `image_key`.
    pub resource_key: String,
}

/// HelloResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HelloResponse {
    pub msg: String,
}
