use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentStaff, CurrentUser};
use crate::api::pagination::default_limit;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::QuizAttempt;
use crate::repositories;
use crate::repositories::feedback::CreateFeedback;
use crate::repositories::student_feedback::CreateStudentFeedback;
use crate::schemas::feedback::{FeedbackCreate, FeedbackResponse, StudentFeedbackResponse};
use crate::services::access_policy::{self, Denied, RequestContext};
use crate::services::storage::StorageBucket;

#[derive(Debug, Deserialize)]
pub(crate) struct FeedbackListQuery {
    #[serde(default)]
    #[serde(alias = "attemptId")]
    attempt_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    student_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "unreadOnly")]
    unread_only: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentFeedbackListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "studentId")]
    student_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "unresolvedOnly")]
    unresolved_only: bool,
}

/// Tutor to student messages, mounted at `/feedback`.
pub(crate) fn tutor_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feedback).post(create_feedback))
        .route("/:feedback_id", delete(delete_feedback))
        .route("/:feedback_id/read", patch(mark_feedback_read))
}

/// Student to tutor messages, mounted at `/student-feedback`.
pub(crate) fn student_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_student_feedback).post(create_student_feedback))
        .route("/:feedback_id", delete(delete_student_feedback))
        .route("/:feedback_id/resolve", patch(resolve_student_feedback))
}

async fn create_feedback(
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<FeedbackCreate>,
) -> Result<(StatusCode, Json<FeedbackResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let ctx = RequestContext::from_user(&staff);
    ensure_attachment_writable(&ctx, payload.attachment_key.as_deref())?;

    let attempt = load_attempt(&state, &payload.attempt_id).await?;

    let feedback = repositories::feedback::create(
        state.db(),
        CreateFeedback {
            id: &Uuid::new_v4().to_string(),
            attempt_id: &attempt.id,
            tutor_id: &staff.id,
            student_id: &attempt.student_id,
            message: payload.message.trim(),
            attachment_key: payload.attachment_key.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create feedback"))?;

    tracing::info!(
        feedback_id = %feedback.id,
        attempt_id = %attempt.id,
        tutor_id = %staff.id,
        "Feedback created"
    );

    Ok((StatusCode::CREATED, Json(FeedbackResponse::from_db(feedback))))
}

async fn list_feedback(
    Query(params): Query<FeedbackListQuery>,
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackResponse>>, ApiError> {
    let ctx = current.context();

    let items = match params.attempt_id.as_deref() {
        Some(attempt_id) if ctx.is_staff() => {
            repositories::feedback::list_by_attempt(state.db(), attempt_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to list feedback"))?
        }
        _ => {
            let student_id =
                access_policy::student_for_read(&ctx, params.student_id.as_deref())?;
            let mut items = repositories::feedback::list_by_student(
                state.db(),
                &student_id,
                params.unread_only,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list feedback"))?;
            if let Some(attempt_id) = params.attempt_id.as_deref() {
                items.retain(|feedback| feedback.attempt_id == attempt_id);
            }
            items
        }
    };

    Ok(Json(items.into_iter().map(FeedbackResponse::from_db).collect()))
}

async fn mark_feedback_read(
    Path(feedback_id): Path<String>,
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let feedback = repositories::feedback::find_by_id(state.db(), &feedback_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch feedback"))?
        .ok_or_else(|| ApiError::NotFound("Feedback not found".to_string()))?;

    if !current.context().owns(&feedback.student_id) {
        return Err(Denied::NotOwner.into());
    }

    let updated = repositories::feedback::mark_read(state.db(), &feedback_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update feedback"))?
        .ok_or_else(|| ApiError::NotFound("Feedback not found".to_string()))?;

    Ok(Json(FeedbackResponse::from_db(updated)))
}

async fn delete_feedback(
    Path(feedback_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::feedback::delete(state.db(), &feedback_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete feedback"))?;
    if !deleted {
        return Err(ApiError::NotFound("Feedback not found".to_string()));
    }

    tracing::info!(feedback_id = %feedback_id, admin_id = %admin.id, "Feedback deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn create_student_feedback(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<FeedbackCreate>,
) -> Result<(StatusCode, Json<StudentFeedbackResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let ctx = current.context();
    ensure_attachment_writable(&ctx, payload.attachment_key.as_deref())?;

    let attempt = load_attempt(&state, &payload.attempt_id).await?;
    if !ctx.owns(&attempt.student_id) {
        return Err(Denied::NotOwner.into());
    }

    let feedback = repositories::student_feedback::create(
        state.db(),
        CreateStudentFeedback {
            id: &Uuid::new_v4().to_string(),
            attempt_id: &attempt.id,
            student_id: &ctx.user_id,
            message: payload.message.trim(),
            attachment_key: payload.attachment_key.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create student feedback"))?;

    tracing::info!(
        feedback_id = %feedback.id,
        attempt_id = %attempt.id,
        student_id = %ctx.user_id,
        "Student feedback created"
    );

    Ok((StatusCode::CREATED, Json(StudentFeedbackResponse::from_db(feedback))))
}

async fn list_student_feedback(
    Query(params): Query<StudentFeedbackListQuery>,
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentFeedbackResponse>>, ApiError> {
    let ctx = current.context();
    let student_id = if ctx.is_staff() {
        params.student_id
    } else {
        Some(access_policy::student_for_read(&ctx, params.student_id.as_deref())?)
    };

    let items = repositories::student_feedback::list(
        state.db(),
        student_id.as_deref(),
        params.unresolved_only,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list student feedback"))?;

    Ok(Json(items.into_iter().map(StudentFeedbackResponse::from_db).collect()))
}

async fn resolve_student_feedback(
    Path(feedback_id): Path<String>,
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<StudentFeedbackResponse>, ApiError> {
    let feedback = repositories::student_feedback::resolve(state.db(), &feedback_id, &staff.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve student feedback"))?
        .ok_or_else(|| ApiError::NotFound("Student feedback not found".to_string()))?;

    tracing::info!(feedback_id = %feedback.id, staff_id = %staff.id, "Student feedback resolved");

    Ok(Json(StudentFeedbackResponse::from_db(feedback)))
}

async fn delete_student_feedback(
    Path(feedback_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::student_feedback::delete(state.db(), &feedback_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student feedback"))?;
    if !deleted {
        return Err(ApiError::NotFound("Student feedback not found".to_string()));
    }

    tracing::info!(feedback_id = %feedback_id, admin_id = %admin.id, "Student feedback deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_attempt(state: &AppState, attempt_id: &str) -> Result<QuizAttempt, ApiError> {
    repositories::attempts::find_by_id(state.db(), attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz attempt"))?
        .ok_or_else(|| ApiError::NotFound("Quiz attempt not found".to_string()))
}

fn ensure_attachment_writable(ctx: &RequestContext, key: Option<&str>) -> Result<(), ApiError> {
    match key {
        Some(key) if !StorageBucket::FeedbackFiles.can_write(ctx, key) => {
            Err(ApiError::BadRequest("Attachment must be an uploaded feedback file".to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests;
