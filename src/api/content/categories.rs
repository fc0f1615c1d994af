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
use crate::schemas::content::{CategoryCreate, CategoryResponse, CategoryUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:category_id",
            get(get_category).patch(update_category).delete(deactivate_category),
        )
}

async fn list_categories(
    current: CurrentUser,
    Query(query): Query<VisibilityQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let include_inactive = query.include_inactive(&current.context());
    let categories = repositories::categories::list(state.db(), include_inactive)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list categories"))?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from_db).collect()))
}

async fn get_category(
    Path(category_id): Path<String>,
    current: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = repositories::categories::find_by_id(state.db(), &category_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch category"))?
        .filter(|category| category.is_active || current.context().is_staff())
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(CategoryResponse::from_db(category)))
}

async fn create_category(
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let name = payload.name.trim();
    ensure_unique_name(&state, name, None).await?;

    let category = repositories::categories::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        name,
        payload.description.as_deref(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create category"))?;

    tracing::info!(category_id = %category.id, staff_id = %staff.id, "Category created");

    Ok((StatusCode::CREATED, Json(CategoryResponse::from_db(category))))
}

async fn update_category(
    Path(category_id): Path<String>,
    CurrentStaff(_staff): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let name = payload.name.as_deref().map(str::trim);
    if let Some(name) = name {
        ensure_unique_name(&state, name, Some(&category_id)).await?;
    }

    repositories::categories::update(
        state.db(),
        &category_id,
        name,
        payload.description.as_deref(),
        payload.is_active,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update category"))?
    .map(|category| Json(CategoryResponse::from_db(category)))
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
}

async fn deactivate_category(
    Path(category_id): Path<String>,
    CurrentStaff(staff): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = repositories::categories::update(
        state.db(),
        &category_id,
        None,
        None,
        Some(false),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to deactivate category"))?
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    tracing::info!(category_id = %category.id, staff_id = %staff.id, "Category deactivated");

    Ok(Json(CategoryResponse::from_db(category)))
}

async fn ensure_unique_name(
    state: &AppState,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::categories::exists_by_name(state.db(), name, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check category name"))?;
    if taken {
        return Err(ApiError::Conflict("Category with this name already exists".to_string()));
    }
    Ok(())
}
