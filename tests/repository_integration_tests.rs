//! PostgreSQL repository tests.
//!
//! These need a live database. They run against `DATABASE_URL` (migrations are applied
//! first) and are skipped with a notice when the variable is not set.

use course_portal::{
    models::{CourseForm, CreateContentRequest, MemberRole},
    repository::{PostgresRepository, Repository, RepositoryError},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use uuid::Uuid;

async fn test_repo() -> Option<PostgresRepository> {
    dotenv::dotenv().ok();
    let Ok(db_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL repository test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(PostgresRepository::new(pool))
}

// Usernames are unique; suffix them so reruns against the same database do not collide.
fn unique(name: &str) -> String {
    format!("{}-{}", name, Uuid::new_v4())
}

fn form(name: &str) -> CourseForm {
    CourseForm {
        name: name.to_string(),
        description: "integration".to_string(),
        price: 9000,
        image_key: None,
    }
}

#[tokio::test]
async fn test_duplicate_username_is_reported() {
    let Some(repo) = test_repo().await else { return };
    let username = unique("alice");

    repo.create_user(&username, "hash").await.unwrap();
    let again = repo.create_user(&username, "hash").await;

    assert!(matches!(again, Err(RepositoryError::Duplicate("username"))));
    let creds = repo.find_credentials(&username).await.unwrap().unwrap();
    assert_eq!(creds.password_hash, "hash");
}

#[tokio::test]
async fn test_update_course_is_teacher_guarded() {
    let Some(repo) = test_repo().await else { return };
    let teacher = repo.create_user(&unique("t1"), "hash").await.unwrap();
    let other = repo.create_user(&unique("t2"), "hash").await.unwrap();

    let course = repo
        .create_course(
            teacher.id,
            CourseForm {
                image_key: Some("courses/a.png".to_string()),
                ..form("Rust 101")
            },
        )
        .await
        .unwrap();

    let denied = repo.update_course(course.id, other.id, form("Stolen")).await.unwrap();
    assert!(denied.is_none());

    let updated = repo
        .update_course(course.id, teacher.id, form("Rust 102"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Rust 102");
    assert_eq!(updated.image.as_deref(), Some("courses/a.png"));
}

#[tokio::test]
async fn test_concurrent_enroll_inserts_one_row() {
    let Some(repo) = test_repo().await else { return };
    let repo = Arc::new(repo);
    let teacher = repo.create_user(&unique("t1"), "hash").await.unwrap();
    let student = repo.create_user(&unique("s1"), "hash").await.unwrap();
    let course = repo.create_course(teacher.id, form("Rust 101")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let (course_id, user_id) = (course.id, student.id);
        handles.push(tokio::spawn(async move {
            repo.enroll(course_id, user_id, MemberRole::Student).await
        }));
    }

    let mut created = 0;
    let mut member_ids = Vec::new();
    for handle in handles {
        let enrollment = handle.await.unwrap().unwrap();
        created += usize::from(enrollment.created);
        member_ids.push(enrollment.member.id);
    }

    assert_eq!(created, 1);
    member_ids.dedup();
    assert_eq!(member_ids.len(), 1);

    let member = repo.find_member(course.id, student.id).await.unwrap().unwrap();
    assert_eq!(member.id, member_ids[0]);
    assert_eq!(member.role, MemberRole::Student);
}

#[tokio::test]
async fn test_comment_lifecycle_and_author_guard() {
    let Some(repo) = test_repo().await else { return };
    let teacher = repo.create_user(&unique("t1"), "hash").await.unwrap();
    let author = repo.create_user(&unique("s1"), "hash").await.unwrap();
    let course = repo.create_course(teacher.id, form("Rust 101")).await.unwrap();
    let content = repo
        .create_content(
            course.id,
            CreateContentRequest {
                name: "Traits".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    let member = repo
        .enroll(course.id, author.id, MemberRole::Student)
        .await
        .unwrap()
        .member;

    let comment = repo
        .create_comment(content.id, member.id, "hi".to_string())
        .await
        .unwrap();
    assert_eq!(repo.list_comments(content.id).await.unwrap(), vec![comment.clone()]);

    assert!(!repo.delete_comment(comment.id, teacher.id).await.unwrap());
    assert!(repo.get_comment(comment.id).await.unwrap().is_some());

    assert!(repo.delete_comment(comment.id, author.id).await.unwrap());
    assert!(repo.get_comment(comment.id).await.unwrap().is_none());
    assert!(!repo.delete_comment(comment.id, author.id).await.unwrap());
}
