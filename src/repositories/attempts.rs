use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::db::models::QuizAttempt;

pub(crate) const COLUMNS: &str = "\
    id, student_id, category_id, difficulty_id, question_ids, total_questions, \
    correct_answers, score, is_completed, started_at, completed_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) category_id: &'a str,
    pub(crate) difficulty_id: &'a str,
    pub(crate) question_ids: &'a [String],
    pub(crate) started_at: time::PrimitiveDateTime,
}

/// Completed attempt joined with its category and difficulty names.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AttemptSummaryRow {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) category_name: String,
    pub(crate) difficulty_id: String,
    pub(crate) difficulty_name: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) score: Option<f64>,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) completed_at: Option<time::PrimitiveDateTime>,
}

const SUMMARY_SELECT: &str = "\
    SELECT a.id, a.category_id, c.name AS category_name, a.difficulty_id, \
           d.name AS difficulty_name, a.total_questions, a.correct_answers, a.score, \
           a.started_at, a.completed_at \
    FROM quiz_attempts a \
    JOIN categories c ON c.id = a.category_id \
    JOIN difficulty_levels d ON d.id = a.difficulty_id";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!("SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    category_id: &str,
    difficulty_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts \
         WHERE student_id = $1 AND category_id = $2 AND difficulty_id = $3"
    ))
    .bind(student_id)
    .bind(category_id)
    .bind(difficulty_id)
    .fetch_optional(executor)
    .await
}

/// Inserts a new attempt. Returns `None` when another attempt for the
/// same student, category and difficulty already exists.
pub(crate) async fn create_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "INSERT INTO quiz_attempts (
            id, student_id, category_id, difficulty_id, question_ids, total_questions,
            correct_answers, score, is_completed, started_at, completed_at
         ) VALUES ($1,$2,$3,$4,$5,$6,0,NULL,FALSE,$7,NULL)
         ON CONFLICT (student_id, category_id, difficulty_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.category_id)
    .bind(params.difficulty_id)
    .bind(Json(params.question_ids))
    .bind(params.question_ids.len() as i32)
    .bind(params.started_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    correct_answers: i32,
    score: f64,
    completed_at: time::PrimitiveDateTime,
) -> Result<QuizAttempt, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts
         SET correct_answers = $1, score = $2, is_completed = TRUE, completed_at = $3
         WHERE id = $4 AND NOT is_completed
         RETURNING {COLUMNS}"
    ))
    .bind(correct_answers)
    .bind(score)
    .bind(completed_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_summary(
    pool: &PgPool,
    id: &str,
) -> Result<Option<AttemptSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSummaryRow>(&format!("{SUMMARY_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Every completed attempt of a student, newest first.
pub(crate) async fn list_completed_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<AttemptSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSummaryRow>(&format!(
        "{SUMMARY_SELECT} WHERE a.student_id = $1 AND a.is_completed \
         ORDER BY a.completed_at DESC, a.id"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}
