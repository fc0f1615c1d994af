use sqlx::PgPool;

use crate::db::models::DifficultyLevel;

const COLUMNS: &str = "id, name, description, level_order, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<DifficultyLevel>, sqlx::Error> {
    sqlx::query_as::<_, DifficultyLevel>(&format!(
        "SELECT {COLUMNS} FROM difficulty_levels WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    include_inactive: bool,
) -> Result<Vec<DifficultyLevel>, sqlx::Error> {
    sqlx::query_as::<_, DifficultyLevel>(&format!(
        "SELECT {COLUMNS} FROM difficulty_levels
         WHERE is_active OR $1
         ORDER BY level_order, name"
    ))
    .bind(include_inactive)
    .fetch_all(pool)
    .await
}

pub(crate) async fn exists_by_name(
    pool: &PgPool,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM difficulty_levels
            WHERE lower(name) = lower($1) AND ($2::varchar IS NULL OR id <> $2)
        )",
    )
    .bind(name)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateDifficulty<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) level_order: i32,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateDifficulty<'_>,
) -> Result<DifficultyLevel, sqlx::Error> {
    sqlx::query_as::<_, DifficultyLevel>(&format!(
        "INSERT INTO difficulty_levels (
            id, name, description, level_order, is_active, created_at, updated_at
         ) VALUES ($1, $2, $3, $4, TRUE, $5, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.level_order)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateDifficulty<'a> {
    pub(crate) name: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) level_order: Option<i32>,
    pub(crate) is_active: Option<bool>,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateDifficulty<'_>,
) -> Result<Option<DifficultyLevel>, sqlx::Error> {
    sqlx::query_as::<_, DifficultyLevel>(&format!(
        "UPDATE difficulty_levels SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            level_order = COALESCE($3, level_order),
            is_active = COALESCE($4, is_active),
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}"
    ))
    .bind(params.name)
    .bind(params.description)
    .bind(params.level_order)
    .bind(params.is_active)
    .bind(params.now)
    .bind(id)
    .fetch_optional(pool)
    .await
}
