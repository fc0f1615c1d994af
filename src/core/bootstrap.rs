use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::users::{CreateUser, UpdateUser};

/// Makes sure the configured super tutor exists, is active and can log in
/// with the configured password.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping super tutor creation");
        return Ok(());
    }

    let username = admin.first_superuser_username.as_str();
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        let password_ok =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        let mut params = UpdateUser::default();
        if !password_ok {
            params.hashed_password =
                Some(security::hash_password(&admin.first_superuser_password)?);
        }
        if user.role != UserRole::SuperTutor {
            params.role = Some(UserRole::SuperTutor);
        }
        if !user.is_active {
            params.is_active = Some(true);
        }

        if params.hashed_password.is_none() && params.role.is_none() && params.is_active.is_none()
        {
            tracing::info!(username, "Default super tutor already up to date");
            return Ok(());
        }

        repositories::users::update(state.db(), &user.id, params, now).await?;
        tracing::info!(username, "Updated default super tutor");
        return Ok(());
    }

    repositories::users::create(
        state.db(),
        CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            email: &admin.first_superuser_email,
            hashed_password: security::hash_password(&admin.first_superuser_password)?,
            full_name: "Super Tutor",
            role: UserRole::SuperTutor,
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(username, "Created default super tutor");
    Ok(())
}
