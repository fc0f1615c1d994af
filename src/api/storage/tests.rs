use crate::db::types::UserRole;
use crate::test_support;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

fn multipart_request(token: &str, bucket: Option<&str>, content_type: &str) -> Request<Body> {
    let boundary = "quizdesk-boundary";
    let mut body = String::new();
    if let Some(bucket) = bucket {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"bucket\"\r\n\r\n{bucket}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.bin\"\r\n\
         Content-Type: {content_type}\r\n\r\nhello\r\n--{boundary}--\r\n"
    ));

    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/storage/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .expect("multipart request")
}

#[tokio::test]
async fn storage_endpoints_unavailable_without_s3() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-upload",
            Some(&token),
            Some(json!({
                "bucket": "avatars",
                "filename": "me.png",
                "content_type": "image/png",
                "size_bytes": 1024
            })),
        ))
        .await
        .expect("presign upload");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn presign_upload_enforces_bucket_policy() {
    let ctx = test_support::setup_test_context_with_storage().await;

    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-upload",
            Some(&token),
            Some(json!({
                "bucket": "avatars",
                "filename": "me.png",
                "content_type": "image/png",
                "size_bytes": 1024
            })),
        ))
        .await
        .expect("presign avatar");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let key = body["key"].as_str().expect("key");
    assert!(key.starts_with(&format!("avatars/{}/", student.id)));
    assert!(body["upload_url"].as_str().expect("url").contains("avatars"));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-upload",
            Some(&token),
            Some(json!({
                "bucket": "question-images",
                "filename": "q.png",
                "content_type": "image/png",
                "size_bytes": 1024
            })),
        ))
        .await
        .expect("presign question image");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-upload",
            Some(&token),
            Some(json!({
                "bucket": "avatars",
                "filename": "huge.png",
                "content_type": "image/png",
                "size_bytes": 6 * 1024 * 1024
            })),
        ))
        .await
        .expect("presign oversized avatar");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-upload",
            Some(&token),
            Some(json!({
                "bucket": "avatars",
                "filename": "song.mp3",
                "content_type": "audio/mpeg",
                "size_bytes": 1024
            })),
        ))
        .await
        .expect("presign wrong type");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feedback_files_are_private_to_owner() {
    let ctx = test_support::setup_test_context_with_storage().await;

    let owner = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let other = test_support::insert_user(ctx.state.db(), "student2", UserRole::Student).await;
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let key = format!("feedback-files/{}/report.pdf", owner.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-download",
            Some(&other_token),
            Some(json!({"bucket": "feedback-files", "key": key})),
        ))
        .await
        .expect("foreign download");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/storage/presign-download",
            Some(&owner_token),
            Some(json!({"bucket": "feedback-files", "key": key})),
        ))
        .await
        .expect("owner download");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["expires_in"], 600);
}

#[tokio::test]
async fn multipart_upload_validates_before_storing() {
    let ctx = test_support::setup_test_context_with_storage().await;

    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(multipart_request(&token, None, "image/png"))
        .await
        .expect("upload without bucket");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(multipart_request(&token, Some("avatars"), "application/zip"))
        .await
        .expect("upload wrong type");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(multipart_request(&token, Some("question-audio"), "audio/mpeg"))
        .await
        .expect("student uploads question audio");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
