use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::quiz::{
    AttemptRequest, EmailLookupRequest, ProgressRequest, RpcEnvelope, StartAttemptRequest,
    SubmitAnswersRequest,
};
use crate::services::access_policy;
use crate::services::quiz_attempts::{self, QuizError};

/// Max username lookups per window for a single username.
const LOOKUP_RATE_LIMIT: u64 = 10;
/// Max username lookups per window from one client, across usernames.
const LOOKUP_CLIENT_RATE_LIMIT: u64 = 30;
const LOOKUP_RATE_WINDOW_SECONDS: u64 = 60;

/// Renders a service outcome as an RPC envelope. Domain failures are
/// successful HTTP exchanges; authorization failures and database errors are not.
fn envelope<T: Serialize>(
    rpc: &'static str,
    result: Result<T, QuizError>,
) -> Result<Response, ApiError> {
    match result {
        Ok(data) => Ok((StatusCode::OK, Json(RpcEnvelope::ok(data))).into_response()),
        Err(QuizError::Denied(denied)) => Err(denied.into()),
        Err(QuizError::Database(err)) => {
            tracing::error!(error = %err, rpc, "RPC failed");
            let body = RpcEnvelope::<()>::err(QuizError::Database(err).to_string());
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
        Err(err) => {
            tracing::debug!(error = %err, rpc, "RPC rejected");
            Ok((StatusCode::OK, Json(RpcEnvelope::<()>::err(err.to_string()))).into_response())
        }
    }
}

fn validate(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`. Unproxied callers share one bucket.
pub(super) fn client_address(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|value| value.to_str().ok());

    forwarded
        .or(real_ip)
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub(super) async fn get_email_from_username(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EmailLookupRequest>,
) -> Result<Response, ApiError> {
    validate(&payload)?;

    let limits = [
        (
            format!("rl:email_lookup:client:{}", client_address(&headers)),
            LOOKUP_CLIENT_RATE_LIMIT,
        ),
        (
            format!("rl:email_lookup:{}", payload.username.trim().to_lowercase()),
            LOOKUP_RATE_LIMIT,
        ),
    ];
    for (key, limit) in &limits {
        if !state.redis().allow(key, *limit, LOOKUP_RATE_WINDOW_SECONDS).await {
            metrics::record_rate_limited("email_lookup");
            return Err(ApiError::TooManyRequests("Too many lookups, try again later"));
        }
    }

    let result = quiz_attempts::email_for_username(state.db(), &payload.username).await;
    envelope("get_email_from_username", result)
}

pub(super) async fn start_quiz_attempt(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<Response, ApiError> {
    validate(&payload)?;

    let ctx = current.context();
    let student_id = access_policy::student_for_write(&ctx, payload.student_id.as_deref())?;

    let result = quiz_attempts::start_attempt(
        state.db(),
        state.settings(),
        &student_id,
        &payload.category_id,
        &payload.difficulty_id,
        payload.question_count,
    )
    .await;
    envelope("start_quiz_attempt", result)
}

pub(super) async fn submit_quiz_answers(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Response, ApiError> {
    validate(&payload)?;

    let result = quiz_attempts::submit_answers(
        state.db(),
        &current.context(),
        &payload.attempt_id,
        &payload.answers,
    )
    .await;
    envelope("submit_quiz_answers", result)
}

pub(super) async fn get_quiz_results(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptRequest>,
) -> Result<Response, ApiError> {
    validate(&payload)?;

    let result =
        quiz_attempts::get_results(state.db(), &current.context(), &payload.attempt_id).await;
    envelope("get_quiz_results", result)
}

pub(super) async fn get_student_progress(
    current: CurrentUser,
    State(state): State<AppState>,
    payload: Option<Json<ProgressRequest>>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let student_id =
        access_policy::student_for_read(&current.context(), payload.student_id.as_deref())?;

    let result =
        quiz_attempts::student_progress(state.db(), state.settings(), &student_id).await;
    envelope("get_student_progress", result)
}

pub(super) async fn get_available_quizzes(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let result = quiz_attempts::available_quizzes(state.db()).await;
    envelope("get_available_quizzes", result)
}
