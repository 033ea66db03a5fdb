use crate::models::{
    Comment, Course, CourseContent, CourseForm, CourseMember, CreateContentRequest, Enrollment,
    MemberRole, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// RepositoryError
///
/// Failures surfaced by any `Repository` implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A uniqueness constraint rejected the write.
    #[error("{0} already exists")]
    Duplicate(&'static str),
    /// A foreign-key style reference pointed at a missing row.
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so the engine and
/// handlers never depend on the concrete store (Postgres, in-memory, test mocks).
///
/// Writes that carry an authorization rule (`update_course`, `delete_comment`) take the
/// caller's id and apply the rule in the write itself, so a concurrent change between
/// the engine's check and the write cannot widen access.
///
/// **Send + Sync + async_trait** are required to make `Arc<dyn Repository>` shareable
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>>;
    // Fails with `Duplicate("username")` when the name is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User>;

    // --- Courses ---
    async fn list_courses(&self, limit: i64, offset: i64) -> RepoResult<Vec<Course>>;
    async fn count_courses(&self) -> RepoResult<i64>;
    async fn get_course(&self, id: i64) -> RepoResult<Option<Course>>;
    async fn create_course(&self, teacher_id: Uuid, form: CourseForm) -> RepoResult<Course>;
    // Teacher-only: returns None unless `teacher_id` owns the course.
    async fn update_course(
        &self,
        id: i64,
        teacher_id: Uuid,
        form: CourseForm,
    ) -> RepoResult<Option<Course>>;

    // --- Membership ---
    async fn get_member(&self, id: i64) -> RepoResult<Option<CourseMember>>;
    async fn find_member(&self, course_id: i64, user_id: Uuid) -> RepoResult<Option<CourseMember>>;
    /// Atomic insert-if-absent of the (course, user) member row.
    async fn enroll(&self, course_id: i64, user_id: Uuid, role: MemberRole)
    -> RepoResult<Enrollment>;

    // --- Content ---
    async fn get_content(&self, id: i64) -> RepoResult<Option<CourseContent>>;
    async fn create_content(
        &self,
        course_id: i64,
        req: CreateContentRequest,
    ) -> RepoResult<CourseContent>;

    // --- Comments ---
    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>>;
    async fn list_comments(&self, content_id: i64) -> RepoResult<Vec<Comment>>;
    async fn create_comment(
        &self,
        content_id: i64,
        member_id: i64,
        text: String,
    ) -> RepoResult<Comment>;
    // Author-only: deletes only when the comment's member belongs to `user_id`.
    async fn delete_comment(&self, id: i64, user_id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const COURSE_COLUMNS: &str =
    "id, name, description, price, teacher_id, image, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, course_id, user_id, role, created_at";
const CONTENT_COLUMNS: &str = "id, course_id, name, description, created_at";
const COMMENT_COLUMNS: &str = "id, content_id, member_id, comment, created_at";

fn unique_violation(err: sqlx::Error, what: &'static str) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Duplicate(what);
        }
    }
    RepositoryError::Database(err)
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) RETURNING id, username",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username"))
    }

    /// list_courses
    ///
    /// Stable ordering by id so page boundaries do not shift between requests.
    async fn list_courses(&self, limit: i64, offset: i64) -> RepoResult<Vec<Course>> {
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY id ASC LIMIT $1 OFFSET $2");
        let courses = sqlx::query_as::<_, Course>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(courses)
    }

    async fn count_courses(&self) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_course(&self, id: i64) -> RepoResult<Option<Course>> {
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    async fn create_course(&self, teacher_id: Uuid, form: CourseForm) -> RepoResult<Course> {
        let query = format!(
            "INSERT INTO courses (name, description, price, teacher_id, image, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING {COURSE_COLUMNS}"
        );
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(form.name)
            .bind(form.description)
            .bind(form.price)
            .bind(teacher_id)
            .bind(form.image_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(course)
    }

    /// update_course
    ///
    /// Overwrites name/description/price; `COALESCE` keeps the stored image when no new
    /// key is supplied. The `teacher_id` predicate makes the write owner-only.
    async fn update_course(
        &self,
        id: i64,
        teacher_id: Uuid,
        form: CourseForm,
    ) -> RepoResult<Option<Course>> {
        let query = format!(
            r#"
            UPDATE courses
            SET name = $3,
                description = $4,
                price = $5,
                image = COALESCE($6, image),
                updated_at = NOW()
            WHERE id = $1 AND teacher_id = $2
            RETURNING {COURSE_COLUMNS}
            "#
        );
        let course = sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(teacher_id)
            .bind(form.name)
            .bind(form.description)
            .bind(form.price)
            .bind(form.image_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    async fn get_member(&self, id: i64) -> RepoResult<Option<CourseMember>> {
        let query = format!("SELECT {MEMBER_COLUMNS} FROM course_members WHERE id = $1");
        let member = sqlx::query_as::<_, CourseMember>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn find_member(&self, course_id: i64, user_id: Uuid) -> RepoResult<Option<CourseMember>> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM course_members WHERE course_id = $1 AND user_id = $2"
        );
        let member = sqlx::query_as::<_, CourseMember>(&query)
            .bind(course_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    /// enroll
    ///
    /// `ON CONFLICT DO NOTHING` against the `(course_id, user_id)` unique constraint makes
    /// the insert atomic. When it inserts nothing, the existing row is read in a second
    /// statement so a row committed by a concurrent enrollment is visible.
    async fn enroll(
        &self,
        course_id: i64,
        user_id: Uuid,
        role: MemberRole,
    ) -> RepoResult<Enrollment> {
        let insert = format!(
            "INSERT INTO course_members (course_id, user_id, role, created_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (course_id, user_id) DO NOTHING RETURNING {MEMBER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, CourseMember>(&insert)
            .bind(course_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(member) = inserted {
            return Ok(Enrollment {
                member,
                created: true,
            });
        }

        let select = format!(
            "SELECT {MEMBER_COLUMNS} FROM course_members WHERE course_id = $1 AND user_id = $2"
        );
        let member = sqlx::query_as::<_, CourseMember>(&select)
            .bind(course_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Enrollment {
            member,
            created: false,
        })
    }

    async fn get_content(&self, id: i64) -> RepoResult<Option<CourseContent>> {
        let query = format!("SELECT {CONTENT_COLUMNS} FROM course_contents WHERE id = $1");
        let content = sqlx::query_as::<_, CourseContent>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(content)
    }

    async fn create_content(
        &self,
        course_id: i64,
        req: CreateContentRequest,
    ) -> RepoResult<CourseContent> {
        let query = format!(
            "INSERT INTO course_contents (course_id, name, description, created_at) \
             VALUES ($1, $2, $3, NOW()) RETURNING {CONTENT_COLUMNS}"
        );
        let content = sqlx::query_as::<_, CourseContent>(&query)
            .bind(course_id)
            .bind(req.name)
            .bind(req.description)
            .fetch_one(&self.pool)
            .await?;
        Ok(content)
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn list_comments(&self, content_id: i64) -> RepoResult<Vec<Comment>> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE content_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let comments = sqlx::query_as::<_, Comment>(&query)
            .bind(content_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn create_comment(
        &self,
        content_id: i64,
        member_id: i64,
        text: String,
    ) -> RepoResult<Comment> {
        let query = format!(
            "INSERT INTO comments (content_id, member_id, comment, created_at) \
             VALUES ($1, $2, $3, NOW()) RETURNING {COMMENT_COLUMNS}"
        );
        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(content_id)
            .bind(member_id)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;
        Ok(comment)
    }

    /// delete_comment
    ///
    /// The join through `course_members` resolves the author at delete time.
    async fn delete_comment(&self, id: i64, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM comments c
            USING course_members m
            WHERE c.id = $1 AND c.member_id = m.id AND m.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-memory implementation ---

#[derive(Default)]
struct MemoryStore {
    users: Vec<UserCredentials>,
    courses: BTreeMap<i64, Course>,
    members: BTreeMap<i64, CourseMember>,
    contents: BTreeMap<i64, CourseContent>,
    comments: BTreeMap<i64, Comment>,
    last_id: i64,
}

impl MemoryStore {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn member_of(&self, course_id: i64, user_id: Uuid) -> Option<&CourseMember> {
        self.members
            .values()
            .find(|m| m.course_id == course_id && m.user_id == user_id)
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory, used by the test suites and for
/// running the API without PostgreSQL. A single mutex guards the whole store, so every
/// operation (including enrollment's check-and-insert) is atomic.
///
/// It mirrors the relational constraints of the SQL schema: unique usernames, one
/// member row per (course, user) and cascade-free foreign keys.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<MemoryStore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of member rows for the pair; more than one would break enrollment idempotence.
    pub async fn member_count(&self, course_id: i64, user_id: Uuid) -> usize {
        let store = self.store.lock().await;
        store
            .members
            .values()
            .filter(|m| m.course_id == course_id && m.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .map(User::from))
    }

    async fn find_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        let store = self.store.lock().await;
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User> {
        let mut store = self.store.lock().await;
        if store.users.iter().any(|u| u.username == username) {
            return Err(RepositoryError::Duplicate("username"));
        }
        let creds = UserCredentials {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        store.users.push(creds.clone());
        Ok(creds.into())
    }

    async fn list_courses(&self, limit: i64, offset: i64) -> RepoResult<Vec<Course>> {
        let store = self.store.lock().await;
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(store.courses.values().skip(skip).take(take).cloned().collect())
    }

    async fn count_courses(&self) -> RepoResult<i64> {
        let store = self.store.lock().await;
        Ok(i64::try_from(store.courses.len()).unwrap_or(i64::MAX))
    }

    async fn get_course(&self, id: i64) -> RepoResult<Option<Course>> {
        let store = self.store.lock().await;
        Ok(store.courses.get(&id).cloned())
    }

    async fn create_course(&self, teacher_id: Uuid, form: CourseForm) -> RepoResult<Course> {
        let mut store = self.store.lock().await;
        if !store.users.iter().any(|u| u.id == teacher_id) {
            return Err(RepositoryError::MissingReference("teacher"));
        }
        let now = Utc::now();
        let course = Course {
            id: store.next_id(),
            name: form.name,
            description: form.description,
            price: form.price,
            teacher_id,
            image: form.image_key,
            created_at: now,
            updated_at: now,
        };
        store.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        id: i64,
        teacher_id: Uuid,
        form: CourseForm,
    ) -> RepoResult<Option<Course>> {
        let mut store = self.store.lock().await;
        let Some(course) = store
            .courses
            .get_mut(&id)
            .filter(|c| c.teacher_id == teacher_id)
        else {
            return Ok(None);
        };
        course.name = form.name;
        course.description = form.description;
        course.price = form.price;
        if let Some(key) = form.image_key {
            course.image = Some(key);
        }
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn get_member(&self, id: i64) -> RepoResult<Option<CourseMember>> {
        let store = self.store.lock().await;
        Ok(store.members.get(&id).cloned())
    }

    async fn find_member(&self, course_id: i64, user_id: Uuid) -> RepoResult<Option<CourseMember>> {
        let store = self.store.lock().await;
        Ok(store.member_of(course_id, user_id).cloned())
    }

    async fn enroll(
        &self,
        course_id: i64,
        user_id: Uuid,
        role: MemberRole,
    ) -> RepoResult<Enrollment> {
        let mut store = self.store.lock().await;
        if let Some(existing) = store.member_of(course_id, user_id) {
            return Ok(Enrollment {
                member: existing.clone(),
                created: false,
            });
        }
        if !store.courses.contains_key(&course_id) {
            return Err(RepositoryError::MissingReference("course"));
        }
        if !store.users.iter().any(|u| u.id == user_id) {
            return Err(RepositoryError::MissingReference("user"));
        }
        let member = CourseMember {
            id: store.next_id(),
            course_id,
            user_id,
            role,
            created_at: Utc::now(),
        };
        store.members.insert(member.id, member.clone());
        Ok(Enrollment {
            member,
            created: true,
        })
    }

    async fn get_content(&self, id: i64) -> RepoResult<Option<CourseContent>> {
        let store = self.store.lock().await;
        Ok(store.contents.get(&id).cloned())
    }

    async fn create_content(
        &self,
        course_id: i64,
        req: CreateContentRequest,
    ) -> RepoResult<CourseContent> {
        let mut store = self.store.lock().await;
        if !store.courses.contains_key(&course_id) {
            return Err(RepositoryError::MissingReference("course"));
        }
        let content = CourseContent {
            id: store.next_id(),
            course_id,
            name: req.name,
            description: req.description,
            created_at: Utc::now(),
        };
        store.contents.insert(content.id, content.clone());
        Ok(content)
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        let store = self.store.lock().await;
        Ok(store.comments.get(&id).cloned())
    }

    async fn list_comments(&self, content_id: i64) -> RepoResult<Vec<Comment>> {
        let store = self.store.lock().await;
        Ok(store
            .comments
            .values()
            .filter(|c| c.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        content_id: i64,
        member_id: i64,
        text: String,
    ) -> RepoResult<Comment> {
        let mut store = self.store.lock().await;
        if !store.contents.contains_key(&content_id) {
            return Err(RepositoryError::MissingReference("content"));
        }
        if !store.members.contains_key(&member_id) {
            return Err(RepositoryError::MissingReference("member"));
        }
        let comment = Comment {
            id: store.next_id(),
            content_id,
            member_id,
            comment: text,
            created_at: Utc::now(),
        };
        store.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: i64, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        let authored = store
            .comments
            .get(&id)
            .and_then(|c| store.members.get(&c.member_id))
            .is_some_and(|m| m.user_id == user_id);
        if !authored {
            return Ok(false);
        }
        Ok(store.comments.remove(&id).is_some())
    }
}
