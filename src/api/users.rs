use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::api::validation::validate_password_len;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{AdminUserUpdate, ProfileUpdate, UserResponse};
use crate::services::storage::StorageBucket;

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    is_active: Option<bool>,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(me).patch(update_me))
        .route("/:user_id", get(get_user).patch(update_user))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn update_me(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if let Some(avatar_key) = payload.avatar_key.as_deref() {
        if !StorageBucket::Avatars.can_write(&current.context(), avatar_key) {
            return Err(ApiError::Forbidden("Avatar must be stored under your own prefix"));
        }
    }

    let params = repositories::users::UpdateUser {
        full_name: payload.full_name.map(|name| name.trim().to_string()),
        avatar_key: payload.avatar_key,
        ..Default::default()
    };

    repositories::users::update(state.db(), &current.0.id, params, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update profile"))?
        .map(|user| Json(UserResponse::from_db(user)))
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let filters = repositories::users::UserFilters {
        role: params.role,
        is_active: params.is_active,
        search: params.search.filter(|value| !value.trim().is_empty()),
    };

    let users = repositories::users::list(state.db(), &filters, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    let total_count = repositories::users::count(state.db(), &filters)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

async fn get_user(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?;

    let Some(user) = user else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    Ok(Json(UserResponse::from_db(user)))
}

async fn update_user(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let self_demotion =
        payload.role.is_some_and(|role| !role.is_admin()) || payload.is_active == Some(false);
    if admin.id == user_id && self_demotion {
        return Err(ApiError::BadRequest(
            "Super tutors cannot demote or deactivate themselves".to_string(),
        ));
    }

    let hashed_password = match payload.password.as_deref() {
        Some(password) => {
            validate_password_len(password)?;
            Some(
                security::hash_password(password)
                    .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
            )
        }
        None => None,
    };

    let updated = repositories::users::update(
        state.db(),
        &user_id,
        repositories::users::UpdateUser {
            full_name: payload.full_name,
            role: payload.role,
            is_active: payload.is_active,
            hashed_password,
            avatar_key: None,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?;

    let Some(user) = updated else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        role = user.role.as_str(),
        is_active = user.is_active,
        action = "user_update",
        "Super tutor updated user"
    );

    Ok(Json(UserResponse::from_db(user)))
}
