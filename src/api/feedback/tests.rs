use crate::core::time::primitive_now_utc;
use crate::db::models::QuizAttempt;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::attempts::CreateAttempt;
use crate::test_support::{self, TestContext};
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

async fn seed_attempt(ctx: &TestContext, student_id: &str) -> QuizAttempt {
    let category = test_support::insert_category(ctx.state.db(), "Math").await;
    let level = test_support::insert_difficulty(ctx.state.db(), "Easy", 1).await;
    let (question, _) =
        test_support::insert_question(ctx.state.db(), &category.id, &level.id, "1 + 1?").await;

    repositories::attempts::create_if_absent(
        ctx.state.db(),
        CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            student_id,
            category_id: &category.id,
            difficulty_id: &level.id,
            question_ids: &[question.id],
            started_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert attempt")
    .expect("attempt created")
}

#[tokio::test]
async fn tutor_feedback_reaches_student_and_can_be_marked_read() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let other = test_support::insert_user(ctx.state.db(), "student2", UserRole::Student).await;
    let tutor_token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let attempt = seed_attempt(&ctx, &student.id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/feedback",
            Some(&student_token),
            Some(json!({"attempt_id": attempt.id, "message": "self praise"})),
        ))
        .await
        .expect("student posts tutor feedback");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/feedback",
            Some(&tutor_token),
            Some(json!({"attempt_id": attempt.id, "message": "  Nice work  "})),
        ))
        .await
        .expect("create feedback");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["student_id"], student.id.as_str());
    assert_eq!(created["message"], "Nice work");
    assert_eq!(created["is_read"], false);
    let feedback_id = created["id"].as_str().expect("feedback id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/feedback/{feedback_id}/read"),
            Some(&other_token),
            None,
        ))
        .await
        .expect("other student marks read");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/feedback/{feedback_id}/read"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("mark read");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_read"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/feedback?unread_only=true",
            Some(&student_token),
            None,
        ))
        .await
        .expect("list unread");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().expect("array").len(), 0);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/feedback",
            Some(&other_token),
            None,
        ))
        .await
        .expect("other student lists");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn student_feedback_is_owner_only_and_resolved_by_staff() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let admin = test_support::insert_user(ctx.state.db(), "admin1", UserRole::SuperTutor).await;
    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let other = test_support::insert_user(ctx.state.db(), "student2", UserRole::Student).await;
    let tutor_token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let attempt = seed_attempt(&ctx, &student.id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/student-feedback",
            Some(&other_token),
            Some(json!({"attempt_id": attempt.id, "message": "not mine"})),
        ))
        .await
        .expect("foreign student feedback");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/student-feedback",
            Some(&student_token),
            Some(json!({"attempt_id": attempt.id, "message": "Question 3 looks wrong"})),
        ))
        .await
        .expect("create student feedback");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let feedback_id = created["id"].as_str().expect("feedback id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/student-feedback?unresolved_only=true",
            Some(&tutor_token),
            None,
        ))
        .await
        .expect("staff list");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().expect("array").len(), 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/student-feedback/{feedback_id}/resolve"),
            Some(&tutor_token),
            None,
        ))
        .await
        .expect("resolve");
    let body = test_support::read_json(response).await;
    assert_eq!(body["is_resolved"], true);
    assert_eq!(body["resolved_by"], tutor.id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/student-feedback/{feedback_id}"),
            Some(&tutor_token),
            None,
        ))
        .await
        .expect("tutor delete");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/student-feedback/{feedback_id}"),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("admin delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn attachment_outside_feedback_bucket_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let attempt = seed_attempt(&ctx, &student.id).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/student-feedback",
            Some(&token),
            Some(json!({
                "attempt_id": attempt.id,
                "message": "see attached",
                "attachment_key": "feedback-files/someone-else/notes.pdf"
            })),
        ))
        .await
        .expect("create with foreign attachment");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recipient_can_download_tutor_attachment() {
    let ctx = test_support::setup_test_context_with_storage().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let other = test_support::insert_user(ctx.state.db(), "student2", UserRole::Student).await;
    let tutor_token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let attempt = seed_attempt(&ctx, &student.id).await;
    let key = format!("feedback-files/{}/notes.pdf", tutor.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/feedback",
            Some(&tutor_token),
            Some(json!({"attempt_id": attempt.id, "message": "see notes", "attachment_key": key})),
        ))
        .await
        .expect("tutor posts feedback");
    assert_eq!(response.status(), StatusCode::CREATED);

    let download = |token: String| {
        ctx.app.clone().oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-download",
            Some(&token),
            Some(json!({"bucket": "feedback-files", "key": key})),
        ))
    };

    let response = download(student_token).await.expect("recipient download");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["key"], key.as_str());

    let response = download(other_token).await.expect("foreign download");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
