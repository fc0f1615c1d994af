use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::QuestionOption;
use crate::repositories;
use crate::repositories::questions::{CreateOption, CreateQuestion, QuestionFilters, UpdateQuestion};
use crate::schemas::content::{
    OptionCreate, OptionResponse, OptionUpdate, QuestionCreate, QuestionResponse, QuestionUpdate,
};
use crate::services::question_rules::{self, CorrectnessChange};

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "categoryId")]
    category_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "difficultyId")]
    difficulty_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "includeInactive")]
    include_inactive: bool,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route(
            "/:question_id",
            get(get_question).patch(update_question).delete(deactivate_question),
        )
        .route("/:question_id/options", post(add_option))
        .route("/:question_id/options/:option_id", patch(update_option))
}

async fn list_questions(
    Query(params): Query<QuestionListQuery>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuestionResponse>>, ApiError> {
    let filters = QuestionFilters {
        category_id: params.category_id,
        difficulty_id: params.difficulty_id,
        include_inactive: params.include_inactive,
    };

    let questions =
        repositories::questions::list(state.db(), &filters, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total_count = repositories::questions::count(state.db(), &filters)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    let ids: Vec<String> = questions.iter().map(|question| question.id.clone()).collect();
    let options = repositories::questions::list_options(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;

    let mut by_question: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id.clone()).or_default().push(option);
    }

    let items = questions
        .into_iter()
        .map(|question| {
            let own = by_question.remove(&question.id).unwrap_or_default();
            QuestionResponse::from_db(question, own)
        })
        .collect();

    Ok(Json(PaginatedResponse::new(items, total_count, params.skip, params.limit)))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    Ok(Json(load_question(&state, &question_id).await?))
}

async fn create_question(
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    question_rules::validate_new_options(&payload.options).map_err(ApiError::BadRequest)?;
    ensure_quiz_exists(&state, &payload.category_id, &payload.difficulty_id).await?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let question = repositories::questions::create(
        &mut *tx,
        CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            category_id: &payload.category_id,
            difficulty_id: &payload.difficulty_id,
            question_text: payload.question_text.trim(),
            explanation: payload.explanation.as_deref(),
            image_key: payload.image_key.as_deref(),
            audio_key: payload.audio_key.as_deref(),
            created_by: Some(&staff.id),
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    let mut options = Vec::with_capacity(payload.options.len());
    for (index, option) in payload.options.iter().enumerate() {
        let created = repositories::questions::create_option(
            &mut *tx,
            CreateOption {
                id: &Uuid::new_v4().to_string(),
                question_id: &question.id,
                option_text: option.option_text.trim(),
                is_correct: option.is_correct,
                order_index: option.order_index.unwrap_or(index as i32),
                now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create option"))?;
        options.push(created);
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit question"))?;

    tracing::info!(
        question_id = %question.id,
        staff_id = %staff.id,
        options = options.len(),
        "Question created"
    );

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, options))))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.category_id.is_some() || payload.difficulty_id.is_some() {
        let current = repositories::questions::find_by_id(state.db(), &question_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
            .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
        let category_id = payload.category_id.as_deref().unwrap_or(&current.category_id);
        let difficulty_id = payload.difficulty_id.as_deref().unwrap_or(&current.difficulty_id);
        ensure_quiz_exists(&state, category_id, difficulty_id).await?;
    }

    let updated = repositories::questions::update(
        state.db(),
        &question_id,
        UpdateQuestion {
            category_id: payload.category_id,
            difficulty_id: payload.difficulty_id,
            question_text: payload.question_text.map(|text| text.trim().to_string()),
            explanation: payload.explanation,
            image_key: payload.image_key,
            audio_key: payload.audio_key,
            is_active: payload.is_active,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?;

    if updated.is_none() {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    Ok(Json(load_question(&state, &question_id).await?))
}

async fn deactivate_question(
    Path(question_id): Path<String>,
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let params = UpdateQuestion { is_active: Some(false), ..Default::default() };
    let updated =
        repositories::questions::update(state.db(), &question_id, params, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to deactivate question"))?;

    if updated.is_none() {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    tracing::info!(question_id = %question_id, staff_id = %staff.id, "Question deactivated");

    Ok(Json(load_question(&state, &question_id).await?))
}

async fn add_option(
    Path(question_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<OptionCreate>,
) -> Result<(StatusCode, Json<OptionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exists = repositories::questions::lock_for_update(&mut *tx, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock question"))?;
    if !exists {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    let order_index = match payload.order_index {
        Some(index) => index,
        None => repositories::questions::next_option_index(&mut *tx, &question_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to compute option order"))?,
    };

    let option_id = Uuid::new_v4().to_string();
    if payload.is_correct {
        repositories::questions::clear_other_correct(&mut *tx, &question_id, &option_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update options"))?;
    }

    let option = repositories::questions::create_option(
        &mut *tx,
        CreateOption {
            id: &option_id,
            question_id: &question_id,
            option_text: payload.option_text.trim(),
            is_correct: payload.is_correct,
            order_index,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create option"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit option"))?;

    Ok((StatusCode::CREATED, Json(OptionResponse::from_db(option))))
}

async fn update_option(
    Path((question_id, option_id)): Path<(String, String)>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<OptionUpdate>,
) -> Result<Json<OptionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::questions::lock_for_update(&mut *tx, &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock question"))?;

    let current = repositories::questions::find_option(&mut *tx, &question_id, &option_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch option"))?
        .ok_or_else(|| ApiError::NotFound("Option not found".to_string()))?;

    let change = question_rules::correctness_change(current.is_correct, payload.is_correct)
        .map_err(ApiError::BadRequest)?;
    let is_correct = match change {
        CorrectnessChange::Keep => None,
        CorrectnessChange::MakeCorrect => {
            repositories::questions::clear_other_correct(&mut *tx, &question_id, &option_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to update options"))?;
            Some(true)
        }
    };

    let option = repositories::questions::update_option(
        &mut *tx,
        &option_id,
        payload.option_text.as_deref().map(str::trim),
        is_correct,
        payload.order_index,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update option"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit option"))?;

    Ok(Json(OptionResponse::from_db(option)))
}

async fn load_question(state: &AppState, question_id: &str) -> Result<QuestionResponse, ApiError> {
    let question = repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    let options = repositories::questions::list_options(state.db(), &[question.id.clone()])
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;

    Ok(QuestionResponse::from_db(question, options))
}

async fn ensure_quiz_exists(
    state: &AppState,
    category_id: &str,
    difficulty_id: &str,
) -> Result<(), ApiError> {
    let category = repositories::categories::find_by_id(state.db(), category_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch category"))?;
    if category.is_none() {
        return Err(ApiError::BadRequest("Unknown category".to_string()));
    }

    let difficulty = repositories::difficulty_levels::find_by_id(state.db(), difficulty_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch difficulty level"))?;
    if difficulty.is_none() {
        return Err(ApiError::BadRequest("Unknown difficulty level".to_string()));
    }

    Ok(())
}
