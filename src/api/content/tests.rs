use crate::db::types::UserRole;
use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn students_only_see_active_categories() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let tutor_token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    let active = test_support::insert_category(ctx.state.db(), "Geography").await;
    let retired = test_support::insert_category(ctx.state.db(), "History").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/categories/{}", retired.id),
            Some(&tutor_token),
            None,
        ))
        .await
        .expect("deactivate category");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["is_active"], false);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/categories?include_inactive=true",
            Some(&student_token),
            None,
        ))
        .await
        .expect("list categories");
    let listed = test_support::read_json(response).await;
    let names: Vec<&str> =
        listed.as_array().expect("array").iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, vec![active.name.as_str()]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/categories/{}", retired.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("get retired category");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/categories?include_inactive=true",
            Some(&tutor_token),
            None,
        ))
        .await
        .expect("staff list categories");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn students_cannot_manage_content() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_user(ctx.state.db(), "student1", UserRole::Student).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/categories",
            Some(&token),
            Some(json!({"name": "Science"})),
        ))
        .await
        .expect("create category");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/questions", Some(&token), None))
        .await
        .expect("list questions");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_difficulty_name_conflicts() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    test_support::insert_difficulty(ctx.state.db(), "Easy", 1).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/difficulty-levels",
            Some(&token),
            Some(json!({"name": "Easy", "level_order": 2})),
        ))
        .await
        .expect("create difficulty");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn question_requires_exactly_one_correct_option() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let category = test_support::insert_category(ctx.state.db(), "Math").await;
    let level = test_support::insert_difficulty(ctx.state.db(), "Easy", 1).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/questions",
            Some(&token),
            Some(json!({
                "category_id": category.id,
                "difficulty_id": level.id,
                "question_text": "2 + 2?",
                "options": [
                    {"option_text": "4", "is_correct": true},
                    {"option_text": "5", "is_correct": true}
                ]
            })),
        ))
        .await
        .expect("create question");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/questions",
            Some(&token),
            Some(json!({
                "category_id": category.id,
                "difficulty_id": level.id,
                "question_text": "2 + 2?",
                "explanation": "Basic addition",
                "options": [
                    {"option_text": "4", "is_correct": true},
                    {"option_text": "5", "is_correct": false}
                ]
            })),
        ))
        .await
        .expect("create question");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["created_by"], tutor.id.as_str());
    assert_eq!(body["options"].as_array().expect("options").len(), 2);
    assert_eq!(body["options"][0]["order_index"], 0);
    assert_eq!(body["options"][1]["order_index"], 1);
}

#[tokio::test]
async fn marking_option_correct_unmarks_siblings() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let category = test_support::insert_category(ctx.state.db(), "Math").await;
    let level = test_support::insert_difficulty(ctx.state.db(), "Easy", 1).await;
    let (question, options) =
        test_support::insert_question(ctx.state.db(), &category.id, &level.id, "1 + 1?").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/questions/{}/options/{}", question.id, options[0].id),
            Some(&token),
            Some(json!({"is_correct": false})),
        ))
        .await
        .expect("unmark only correct option");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/questions/{}/options/{}", question.id, options[2].id),
            Some(&token),
            Some(json!({"is_correct": true, "option_text": "two"})),
        ))
        .await
        .expect("mark option correct");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["is_correct"], true);
    assert_eq!(body["option_text"], "two");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/questions/{}/options", question.id),
            Some(&token),
            Some(json!({"option_text": "eleven"})),
        ))
        .await
        .expect("add option");
    let status = response.status();
    let added = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {added}");
    assert_eq!(added["order_index"], 3);
    assert_eq!(added["is_correct"], false);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/questions/{}", question.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get question");
    let body = test_support::read_json(response).await;
    let correct: Vec<&str> = body["options"]
        .as_array()
        .expect("options")
        .iter()
        .filter(|option| option["is_correct"] == true)
        .filter_map(|option| option["id"].as_str())
        .collect();
    assert_eq!(correct, vec![options[2].id.as_str()]);
}

#[tokio::test]
async fn deactivated_question_is_filtered_from_default_listing() {
    let ctx = test_support::setup_test_context().await;

    let tutor = test_support::insert_user(ctx.state.db(), "tutor1", UserRole::Tutor).await;
    let token = test_support::bearer_token(&tutor.id, ctx.state.settings());
    let category = test_support::insert_category(ctx.state.db(), "Math").await;
    let level = test_support::insert_difficulty(ctx.state.db(), "Easy", 1).await;
    let (retired, _) =
        test_support::insert_question(ctx.state.db(), &category.id, &level.id, "old").await;
    test_support::insert_question(ctx.state.db(), &category.id, &level.id, "new").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/questions/{}", retired.id),
            Some(&token),
            None,
        ))
        .await
        .expect("deactivate question");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/questions?category_id={}", category.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list questions");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["question_text"], "new");
    assert_eq!(listed["items"][0]["options"].as_array().expect("options").len(), 3);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/questions?include_inactive=true",
            Some(&token),
            None,
        ))
        .await
        .expect("list all questions");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 2);
}

#[test]
fn include_inactive_requires_staff() {
    use super::VisibilityQuery;
    use crate::services::access_policy::RequestContext;

    let query = VisibilityQuery { include_inactive: true };
    let student = RequestContext {
        user_id: "s".to_string(),
        username: "s".to_string(),
        role: UserRole::Student,
    };
    let tutor = RequestContext { role: UserRole::Tutor, ..student.clone() };

    assert!(!query.include_inactive(&student));
    assert!(query.include_inactive(&tutor));
    assert!(!VisibilityQuery::default().include_inactive(&tutor));
}
