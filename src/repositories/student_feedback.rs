use sqlx::PgPool;

use crate::db::models::StudentFeedback;

pub(crate) const COLUMNS: &str =
    "id, attempt_id, student_id, message, attachment_key, is_resolved, resolved_by, created_at";

pub(crate) struct CreateStudentFeedback<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) message: &'a str,
    pub(crate) attachment_key: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateStudentFeedback<'_>,
) -> Result<StudentFeedback, sqlx::Error> {
    sqlx::query_as::<_, StudentFeedback>(&format!(
        "INSERT INTO student_feedback (
            id, attempt_id, student_id, message, attachment_key, is_resolved, resolved_by, created_at
         ) VALUES ($1,$2,$3,$4,$5,FALSE,NULL,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.student_id)
    .bind(params.message)
    .bind(params.attachment_key)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    student_id: Option<&str>,
    unresolved_only: bool,
    skip: i64,
    limit: i64,
) -> Result<Vec<StudentFeedback>, sqlx::Error> {
    sqlx::query_as::<_, StudentFeedback>(&format!(
        "SELECT {COLUMNS} FROM student_feedback
         WHERE ($1::TEXT IS NULL OR student_id = $1)
           AND ($2 = FALSE OR NOT is_resolved)
         ORDER BY created_at DESC
         OFFSET $3 LIMIT $4"
    ))
    .bind(student_id)
    .bind(unresolved_only)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn resolve(
    pool: &PgPool,
    id: &str,
    resolved_by: &str,
) -> Result<Option<StudentFeedback>, sqlx::Error> {
    sqlx::query_as::<_, StudentFeedback>(&format!(
        "UPDATE student_feedback SET is_resolved = TRUE, resolved_by = $1
         WHERE id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(resolved_by)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM student_feedback WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
