use sqlx::PgPool;

use crate::db::models::Feedback;

pub(crate) const COLUMNS: &str =
    "id, attempt_id, tutor_id, student_id, message, attachment_key, is_read, created_at";

pub(crate) struct CreateFeedback<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) tutor_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) message: &'a str,
    pub(crate) attachment_key: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateFeedback<'_>,
) -> Result<Feedback, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "INSERT INTO feedback (id, attempt_id, tutor_id, student_id, message, attachment_key, is_read, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,FALSE,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.tutor_id)
    .bind(params.student_id)
    .bind(params.message)
    .bind(params.attachment_key)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!("SELECT {COLUMNS} FROM feedback WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
    unread_only: bool,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {COLUMNS} FROM feedback
         WHERE student_id = $1 AND ($2 = FALSE OR NOT is_read)
         ORDER BY created_at DESC"
    ))
    .bind(student_id)
    .bind(unread_only)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {COLUMNS} FROM feedback WHERE attempt_id = $1 ORDER BY created_at DESC"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn mark_read(pool: &PgPool, id: &str) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>(&format!(
        "UPDATE feedback SET is_read = TRUE WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM feedback WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// True when `key` is attached to feedback addressed to `student_id`.
pub(crate) async fn is_recipient(
    pool: &PgPool,
    student_id: &str,
    key: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM feedback WHERE student_id = $1 AND attachment_key = $2)",
    )
    .bind(student_id)
    .bind(key)
    .fetch_one(pool)
    .await
}
