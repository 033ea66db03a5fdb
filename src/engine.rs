//! Authorization & membership engine.
//!
//! Every mutation in the portal goes through one of these functions. Each takes the
//! resolved caller and the repository, decides allow/deny, then performs the write.
//! Denials come back as `LmsError` values; nothing here panics or retries.
//!
//! Rules:
//! * any authenticated user may create a course and becomes its teacher;
//! * only the teacher may update a course or add content to it;
//! * enrollment is get-or-create, never a duplicate row and never an error on repeat;
//! * only a member of the content's course may comment on it;
//! * only the member who wrote a comment may delete it.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::LmsError,
    models::{
        Comment, Course, CourseContent, CourseForm, CoursePage, CreateContentRequest, Enrollment,
        MemberRole, PageParams,
    },
    repository::Repository,
    storage::{COURSE_IMAGE_PREFIX, sanitize_key},
};

fn validate_course_form(form: &CourseForm) -> Result<(), LmsError> {
    if form.name.trim().is_empty() {
        return Err(LmsError::invalid("course name must not be empty"));
    }
    if form.price < 0 {
        return Err(LmsError::invalid("course price must not be negative"));
    }
    if let Some(key) = &form.image_key {
        // Only keys in the shape `/upload/presigned` hands out.
        if !key.starts_with(COURSE_IMAGE_PREFIX) || sanitize_key(key) != *key {
            return Err(LmsError::invalid("image_key is not a course image key"));
        }
    }
    Ok(())
}

async fn existing_course(repo: &dyn Repository, course_id: i64) -> Result<Course, LmsError> {
    repo.get_course(course_id)
        .await?
        .ok_or(LmsError::NotFound("course"))
}

fn require_teacher(course: &Course, caller: &AuthUser) -> Result<(), LmsError> {
    if course.teacher_id != caller.id {
        tracing::warn!(course_id = course.id, user_id = %caller.id, "caller is not the course teacher");
        return Err(LmsError::forbidden("only the course teacher may modify this course"));
    }
    Ok(())
}

/// Lists courses one page at a time. Public.
pub async fn list_courses(repo: &dyn Repository, params: PageParams) -> Result<CoursePage, LmsError> {
    let (limit, offset) = params.window();
    let items = repo.list_courses(limit, offset).await?;
    let count = repo.count_courses().await?;
    Ok(CoursePage { items, count })
}

pub async fn get_course(repo: &dyn Repository, course_id: i64) -> Result<Course, LmsError> {
    existing_course(repo, course_id).await
}

/// create_course
///
/// The caller becomes the teacher. No other authorization applies.
pub async fn create_course(
    repo: &dyn Repository,
    caller: &AuthUser,
    form: CourseForm,
) -> Result<Course, LmsError> {
    validate_course_form(&form)?;
    let course = repo.create_course(caller.id, form).await?;
    tracing::info!(course_id = course.id, teacher_id = %caller.id, "course created");
    Ok(course)
}

/// update_course
///
/// NotFound when the course is absent, Forbidden unless the caller is its teacher.
/// The repository write repeats the teacher predicate; a `None` from it means the row
/// disappeared between the check and the write.
pub async fn update_course(
    repo: &dyn Repository,
    caller: &AuthUser,
    course_id: i64,
    form: CourseForm,
) -> Result<Course, LmsError> {
    let course = existing_course(repo, course_id).await?;
    require_teacher(&course, caller)?;
    validate_course_form(&form)?;

    let updated = repo
        .update_course(course_id, caller.id, form)
        .await?
        .ok_or(LmsError::NotFound("course"))?;
    tracing::info!(course_id, teacher_id = %caller.id, "course updated");
    Ok(updated)
}

/// enroll
///
/// Idempotent: a second call for the same pair returns the existing member with
/// `created == false`.
pub async fn enroll(
    repo: &dyn Repository,
    caller: &AuthUser,
    course_id: i64,
) -> Result<Enrollment, LmsError> {
    existing_course(repo, course_id).await?;
    let enrollment = repo.enroll(course_id, caller.id, MemberRole::default()).await?;
    if enrollment.created {
        tracing::info!(course_id, user_id = %caller.id, member_id = enrollment.member.id, "user enrolled");
    } else {
        tracing::debug!(course_id, user_id = %caller.id, "user already enrolled");
    }
    Ok(enrollment)
}

/// Supplementary membership query (the model-level `is_member`).
pub async fn is_member(repo: &dyn Repository, course_id: i64, user_id: Uuid) -> Result<bool, LmsError> {
    Ok(repo.find_member(course_id, user_id).await?.is_some())
}

/// create_content
///
/// Teacher-only, like `update_course`.
pub async fn create_content(
    repo: &dyn Repository,
    caller: &AuthUser,
    course_id: i64,
    req: CreateContentRequest,
) -> Result<CourseContent, LmsError> {
    let course = existing_course(repo, course_id).await?;
    require_teacher(&course, caller)?;
    if req.name.trim().is_empty() {
        return Err(LmsError::invalid("content name must not be empty"));
    }

    let content = repo.create_content(course_id, req).await?;
    tracing::info!(course_id, content_id = content.id, "content created");
    Ok(content)
}

/// Comments of one content item, oldest first. Public; NotFound for unknown content.
pub async fn list_comments(repo: &dyn Repository, content_id: i64) -> Result<Vec<Comment>, LmsError> {
    repo.get_content(content_id)
        .await?
        .ok_or(LmsError::NotFound("content"))?;
    Ok(repo.list_comments(content_id).await?)
}

pub async fn get_comment(repo: &dyn Repository, comment_id: i64) -> Result<Comment, LmsError> {
    repo.get_comment(comment_id)
        .await?
        .ok_or(LmsError::NotFound("comment"))
}

/// create_comment
///
/// The caller must hold a member row in the content's course; that row becomes the
/// comment's author reference.
pub async fn create_comment(
    repo: &dyn Repository,
    caller: &AuthUser,
    content_id: i64,
    text: String,
) -> Result<Comment, LmsError> {
    let content = repo
        .get_content(content_id)
        .await?
        .ok_or(LmsError::NotFound("content"))?;
    if text.trim().is_empty() {
        return Err(LmsError::invalid("comment must not be empty"));
    }

    let Some(member) = repo.find_member(content.course_id, caller.id).await? else {
        tracing::warn!(content_id, user_id = %caller.id, "comment from a user not enrolled in the course");
        return Err(LmsError::forbidden("you are not enrolled in this course"));
    };

    let comment = repo.create_comment(content.id, member.id, text).await?;
    tracing::info!(comment_id = comment.id, content_id, member_id = member.id, "comment created");
    Ok(comment)
}

/// delete_comment
///
/// The author is resolved through the comment's member reference at check time. A
/// second delete of the same id is NotFound.
pub async fn delete_comment(
    repo: &dyn Repository,
    caller: &AuthUser,
    comment_id: i64,
) -> Result<(), LmsError> {
    let comment = get_comment(repo, comment_id).await?;
    let author = repo
        .get_member(comment.member_id)
        .await?
        .map(|member| member.user_id);
    if author != Some(caller.id) {
        tracing::warn!(comment_id, user_id = %caller.id, "caller is not the comment author");
        return Err(LmsError::forbidden("only the author may delete this comment"));
    }

    // Same ownership rule applied in the delete; false means it was deleted concurrently.
    if !repo.delete_comment(comment_id, caller.id).await? {
        return Err(LmsError::NotFound("comment"));
    }
    tracing::info!(comment_id, user_id = %caller.id, "comment deleted");
    Ok(())
}
