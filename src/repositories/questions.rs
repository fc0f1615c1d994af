use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::db::models::{Question, QuestionOption};

pub(crate) const COLUMNS: &str = "\
    id, category_id, difficulty_id, question_text, explanation, image_key, audio_key, \
    is_active, created_by, created_at, updated_at";

const OPTION_COLUMNS: &str = "id, question_id, option_text, is_correct, order_index, created_at";

/// One (category, difficulty) pair that currently has active questions.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AvailableQuizRow {
    pub(crate) category_id: String,
    pub(crate) category_name: String,
    pub(crate) category_description: Option<String>,
    pub(crate) difficulty_id: String,
    pub(crate) difficulty_name: String,
    pub(crate) level_order: i32,
    pub(crate) question_count: i64,
}

pub(crate) struct QuestionFilters {
    pub(crate) category_id: Option<String>,
    pub(crate) difficulty_id: Option<String>,
    pub(crate) include_inactive: bool,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    filters: &QuestionFilters,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questions"));
    push_filters(&mut builder, filters);
    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filters: &QuestionFilters) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions");
    push_filters(&mut builder, filters);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &QuestionFilters) {
    builder.push(" WHERE TRUE");
    if let Some(category_id) = filters.category_id.as_ref() {
        builder.push(" AND category_id = ");
        builder.push_bind(category_id.clone());
    }
    if let Some(difficulty_id) = filters.difficulty_id.as_ref() {
        builder.push(" AND difficulty_id = ");
        builder.push_bind(difficulty_id.clone());
    }
    if !filters.include_inactive {
        builder.push(" AND is_active");
    }
}

/// Random sample without replacement of active questions for a quiz.
pub(crate) async fn sample_active_ids(
    executor: impl sqlx::PgExecutor<'_>,
    category_id: &str,
    difficulty_id: &str,
    count: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT q.id
         FROM questions q
         WHERE q.category_id = $1 AND q.difficulty_id = $2 AND q.is_active
         ORDER BY random()
         LIMIT $3",
    )
    .bind(category_id)
    .bind(difficulty_id)
    .bind(count)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_available_quizzes(
    pool: &PgPool,
) -> Result<Vec<AvailableQuizRow>, sqlx::Error> {
    sqlx::query_as::<_, AvailableQuizRow>(
        "SELECT c.id AS category_id,
                c.name AS category_name,
                c.description AS category_description,
                d.id AS difficulty_id,
                d.name AS difficulty_name,
                d.level_order,
                COUNT(q.id) AS question_count
         FROM questions q
         JOIN categories c ON c.id = q.category_id AND c.is_active
         JOIN difficulty_levels d ON d.id = q.difficulty_id AND d.is_active
         WHERE q.is_active
         GROUP BY c.id, c.name, c.description, d.id, d.name, d.level_order
         HAVING COUNT(q.id) > 0
         ORDER BY c.name, d.level_order, d.name",
    )
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) category_id: &'a str,
    pub(crate) difficulty_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) image_key: Option<&'a str>,
    pub(crate) audio_key: Option<&'a str>,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, category_id, difficulty_id, question_text, explanation, image_key, audio_key,
            is_active, created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,TRUE,$8,$9,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.category_id)
    .bind(params.difficulty_id)
    .bind(params.question_text)
    .bind(params.explanation)
    .bind(params.image_key)
    .bind(params.audio_key)
    .bind(params.created_by)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateQuestion {
    pub(crate) category_id: Option<String>,
    pub(crate) difficulty_id: Option<String>,
    pub(crate) question_text: Option<String>,
    pub(crate) explanation: Option<String>,
    pub(crate) image_key: Option<String>,
    pub(crate) audio_key: Option<String>,
    pub(crate) is_active: Option<bool>,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuestion,
    now: time::PrimitiveDateTime,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            category_id = COALESCE($1, category_id),
            difficulty_id = COALESCE($2, difficulty_id),
            question_text = COALESCE($3, question_text),
            explanation = COALESCE($4, explanation),
            image_key = COALESCE($5, image_key),
            audio_key = COALESCE($6, audio_key),
            is_active = COALESCE($7, is_active),
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}"
    ))
    .bind(params.category_id)
    .bind(params.difficulty_id)
    .bind(params.question_text)
    .bind(params.explanation)
    .bind(params.image_key)
    .bind(params.audio_key)
    .bind(params.is_active)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_options(
    executor: impl sqlx::PgExecutor<'_>,
    question_ids: &[String],
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options
         WHERE question_id = ANY($1)
         ORDER BY question_id, order_index, created_at"
    ))
    .bind(question_ids)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_option(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    option_id: &str,
) -> Result<Option<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options WHERE question_id = $1 AND id = $2"
    ))
    .bind(question_id)
    .bind(option_id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateOption<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) option_text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create_option(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateOption<'_>,
) -> Result<QuestionOption, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "INSERT INTO question_options (id, question_id, option_text, is_correct, order_index, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {OPTION_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.option_text)
    .bind(params.is_correct)
    .bind(params.order_index)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn next_option_index(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM question_options WHERE question_id = $1",
    )
    .bind(question_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update_option(
    executor: impl sqlx::PgExecutor<'_>,
    option_id: &str,
    option_text: Option<&str>,
    is_correct: Option<bool>,
    order_index: Option<i32>,
) -> Result<QuestionOption, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "UPDATE question_options SET
            option_text = COALESCE($1, option_text),
            is_correct = COALESCE($2, is_correct),
            order_index = COALESCE($3, order_index)
         WHERE id = $4
         RETURNING {OPTION_COLUMNS}"
    ))
    .bind(option_text)
    .bind(is_correct)
    .bind(order_index)
    .bind(option_id)
    .fetch_one(executor)
    .await
}

/// Clears the correct flag on every option of the question except `keep_option_id`.
pub(crate) async fn clear_other_correct(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    keep_option_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE question_options SET is_correct = FALSE
         WHERE question_id = $1 AND id <> $2 AND is_correct",
    )
    .bind(question_id)
    .bind(keep_option_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Serializes concurrent option edits of one question.
pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    let locked = sqlx::query_scalar::<_, String>("SELECT id FROM questions WHERE id = $1 FOR UPDATE")
        .bind(question_id)
        .fetch_optional(executor)
        .await?;
    Ok(locked.is_some())
}
