use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::content::VisibilityQuery;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::difficulty_levels::{CreateDifficulty, UpdateDifficulty};
use crate::schemas::content::{DifficultyCreate, DifficultyResponse, DifficultyUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_levels).post(create_level)).route(
        "/:difficulty_id",
        get(get_level).patch(update_level).delete(deactivate_level),
    )
}

async fn list_levels(
    current: CurrentUser,
    Query(query): Query<VisibilityQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DifficultyResponse>>, ApiError> {
    let include_inactive = query.include_inactive(&current.context());
    let levels = repositories::difficulty_levels::list(state.db(), include_inactive)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list difficulty levels"))?;

    Ok(Json(levels.into_iter().map(DifficultyResponse::from_db).collect()))
}

async fn get_level(
    Path(difficulty_id): Path<String>,
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DifficultyResponse>, ApiError> {
    repositories::difficulty_levels::find_by_id(state.db(), &difficulty_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch difficulty level"))?
        .filter(|level| level.is_active || current.context().is_staff())
        .map(|level| Json(DifficultyResponse::from_db(level)))
        .ok_or_else(|| ApiError::NotFound("Difficulty level not found".to_string()))
}

async fn create_level(
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<DifficultyCreate>,
) -> Result<(StatusCode, Json<DifficultyResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let name = payload.name.trim();
    ensure_unique_name(&state, name, None).await?;

    let level = repositories::difficulty_levels::create(
        state.db(),
        CreateDifficulty {
            id: &Uuid::new_v4().to_string(),
            name,
            description: payload.description.as_deref(),
            level_order: payload.level_order,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create difficulty level"))?;

    tracing::info!(difficulty_id = %level.id, staff_id = %staff.id, "Difficulty level created");

    Ok((StatusCode::CREATED, Json(DifficultyResponse::from_db(level))))
}

async fn update_level(
    Path(difficulty_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<DifficultyUpdate>,
) -> Result<Json<DifficultyResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let name = payload.name.as_deref().map(str::trim);
    if let Some(name) = name {
        ensure_unique_name(&state, name, Some(&difficulty_id)).await?;
    }

    repositories::difficulty_levels::update(
        state.db(),
        &difficulty_id,
        UpdateDifficulty {
            name,
            description: payload.description.as_deref(),
            level_order: payload.level_order,
            is_active: payload.is_active,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update difficulty level"))?
    .map(|level| Json(DifficultyResponse::from_db(level)))
    .ok_or_else(|| ApiError::NotFound("Difficulty level not found".to_string()))
}

async fn deactivate_level(
    Path(difficulty_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<DifficultyResponse>, ApiError> {
    repositories::difficulty_levels::update(
        state.db(),
        &difficulty_id,
        UpdateDifficulty {
            name: None,
            description: None,
            level_order: None,
            is_active: Some(false),
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to deactivate difficulty level"))?
    .map(|level| Json(DifficultyResponse::from_db(level)))
    .ok_or_else(|| ApiError::NotFound("Difficulty level not found".to_string()))
}

async fn ensure_unique_name(
    state: &AppState,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::difficulty_levels::exists_by_name(state.db(), name, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check difficulty name"))?;
    if taken {
        return Err(ApiError::Conflict(
            "Difficulty level with this name already exists".to_string(),
        ));
    }
    Ok(())
}
