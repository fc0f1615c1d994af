use axum::{
    extract::{Form, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_password_len;
use crate::core::{metrics, security};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{MeResponse, UserCreate, UserLogin, UserResponse};
use crate::services::access_policy::RoleView;

/// Max attempts per window for auth endpoints (login/signup/token).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password_len(&payload.password)?;

    let username = payload.username.trim();
    let email = payload.email.trim();
    enforce_rate_limit(&state, "signup", username).await?;

    let existing = repositories::users::exists_by_username_or_email(state.db(), username, email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing {
        return Err(ApiError::Conflict(
            "User with this username or email already exists".to_string(),
        ));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            email,
            hashed_password,
            full_name: payload.full_name.trim(),
            role: UserRole::Student,
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    tracing::info!(user_id = %user.id, username = %user.username, "Student registered");

    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    enforce_rate_limit(&state, "login", &payload.login).await?;
    let user = authenticate(&state, &payload.login, &payload.password).await?;
    Ok(Json(issue_token(&state, user)?))
}

async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    enforce_rate_limit(&state, "token", &payload.username).await?;
    let user = authenticate(&state, &payload.username, &payload.password).await?;
    Ok(Json(issue_token(&state, user)?))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    let access = RoleView::for_role(user.role);
    Json(MeResponse { user: UserResponse::from_db(user), access })
}

async fn enforce_rate_limit(state: &AppState, action: &str, login: &str) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{}", login.trim().to_lowercase());
    if state.redis().allow(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS).await {
        Ok(())
    } else {
        metrics::record_rate_limited("auth");
        Err(ApiError::TooManyRequests("Too many attempts, try again later"))
    }
}

async fn authenticate(state: &AppState, login: &str, password: &str) -> Result<User, ApiError> {
    let user = repositories::users::find_by_login(state.db(), login.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    Ok(user)
}

fn issue_token(state: &AppState, user: User) -> Result<TokenResponse, ApiError> {
    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let expires_in = state.settings().security().access_token_expire_minutes * 60;
    Ok(TokenResponse::bearer(token, expires_in, UserResponse::from_db(user)))
}
