use course_portal::models::{
    Comment, Course, CourseForm, CourseMember, CredentialsRequest, EnrollResponse, Enrollment, MemberRole,
    PageParams,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_member_role_short_codes() {
    assert_eq!(serde_json::to_value(MemberRole::Student).unwrap(), json!("std"));
    assert_eq!(serde_json::to_value(MemberRole::Assistant).unwrap(), json!("asst"));
    assert_eq!(MemberRole::default(), MemberRole::Student);

    assert_eq!("asst".parse::<MemberRole>().unwrap(), MemberRole::Assistant);
    assert!("teacher".parse::<MemberRole>().is_err());
    assert!(MemberRole::try_from("STD".to_string()).is_err());
}

#[test]
fn test_comment_json_references_member_not_user() {
    let comment = Comment {
        id: 3,
        content_id: 2,
        member_id: 1,
        comment: "hi".to_string(),
        ..Comment::default()
    };

    let value = serde_json::to_value(&comment).unwrap();

    assert_eq!(value["comment"], "hi");
    assert_eq!(value["member_id"], 1);
    assert!(value.get("user_id").is_none());
}

#[test]
fn test_course_form_image_key_is_optional() {
    let form: CourseForm = serde_json::from_value(json!({
        "name": "Rust 101",
        "description": "Ownership",
        "price": 9000
    }))
    .unwrap();
    assert_eq!(form.image_key, None);

    // Absent keys are not serialized back.
    let round = serde_json::to_value(&form).unwrap();
    assert!(round.get("image_key").is_none());

    let missing_price = serde_json::from_value::<CourseForm>(json!({
        "name": "Rust 101",
        "description": "Ownership"
    }));
    assert!(missing_price.is_err());
}

#[test]
fn test_credentials_debug_redacts_password() {
    let creds = CredentialsRequest {
        username: "alice".to_string(),
        password: "hunter2-hunter2".to_string(),
    };

    let rendered = format!("{:?}", creds);
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn test_page_params_window() {
    let defaults = PageParams::default();
    assert_eq!(defaults.window(), (100, 0));

    let third = PageParams {
        page: Some(3),
        page_size: Some(20),
    };
    assert_eq!(third.window(), (20, 40));

    // Oversized pages are clamped and page 0 is treated as page 1.
    let clamped = PageParams {
        page: Some(0),
        page_size: Some(5000),
    };
    assert_eq!(clamped.window(), (i64::from(PageParams::MAX_PAGE_SIZE), 0));
}

#[test]
fn test_enroll_response_message_follows_outcome() {
    let member = CourseMember::default();

    let fresh = EnrollResponse::from(Enrollment {
        member: member.clone(),
        created: true,
    });
    assert_eq!(fresh.message, "Enrolled successfully");

    let repeat = EnrollResponse::from(Enrollment {
        member,
        created: false,
    });
    assert_eq!(repeat.message, "Already enrolled");
    assert!(!repeat.created);
}

#[test]
fn test_course_and_member_display() {
    let course = Course {
        name: "Rust 101".to_string(),
        ..Course::default()
    };
    assert_eq!(course.to_string(), "Rust 101");

    let user_id = Uuid::new_v4();
    let member = CourseMember {
        course_id: 7,
        user_id,
        ..CourseMember::default()
    };
    assert_eq!(member.to_string(), format!("7 : {}", user_id));
}
