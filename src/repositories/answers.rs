use crate::db::models::QuizAnswer;

const COLUMNS: &str = "id, attempt_id, question_id, selected_option_id, is_correct, answered_at";

pub(crate) struct CreateAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_id: Option<&'a str>,
    pub(crate) is_correct: bool,
    pub(crate) answered_at: time::PrimitiveDateTime,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quiz_answers (id, attempt_id, question_id, selected_option_id, is_correct, answered_at)
         VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option_id)
    .bind(params.is_correct)
    .bind(params.answered_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<QuizAnswer>, sqlx::Error> {
    sqlx::query_as::<_, QuizAnswer>(&format!(
        "SELECT {COLUMNS} FROM quiz_answers WHERE attempt_id = $1 ORDER BY answered_at"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}
