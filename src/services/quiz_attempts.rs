use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::core::time::{format_optional, format_primitive, primitive_now_utc};
use crate::db::models::{Question, QuestionOption, QuizAttempt};
use crate::repositories;
use crate::schemas::quiz::{
    AttemptHeader, AvailableQuiz, EmailLookupResponse, OptionResult, QuestionResult,
    QuizCategoryView, QuizDifficultyView, QuizOptionView, QuizQuestionView, QuizResultsResponse,
    StartAttemptResponse, StudentProgress, SubmitAnswersResponse, SubmittedAnswer,
};
use crate::services::access_policy::{self, Denied, RequestContext};
use crate::services::grading;

#[derive(Debug, Error)]
pub(crate) enum QuizError {
    #[error("Username not found")]
    UsernameNotFound,
    #[error("Quiz not found")]
    QuizNotFound,
    #[error("No questions available for this quiz")]
    NoQuestions,
    #[error("You have already completed this quiz")]
    AlreadyCompleted,
    #[error("Quiz attempt not found or already completed")]
    AttemptNotFoundOrCompleted,
    #[error("Quiz attempt not found")]
    AttemptNotFound,
    #[error("Quiz attempt is not completed yet")]
    NotCompleted,
    #[error("Invalid answer submission: {0}")]
    InvalidSubmission(String),
    #[error("{}", .0.message())]
    Denied(Denied),
    #[error("Internal server error")]
    Database(#[from] sqlx::Error),
}

pub(crate) async fn email_for_username(
    pool: &PgPool,
    username: &str,
) -> Result<EmailLookupResponse, QuizError> {
    let (email, user_id) = repositories::users::find_email_by_username(pool, username.trim())
        .await?
        .ok_or(QuizError::UsernameNotFound)?;
    Ok(EmailLookupResponse { email, user_id })
}

/// Clamps a requested question count into `1..=max`, falling back to `default`.
pub(crate) fn effective_question_count(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max.max(1))
}

pub(crate) async fn start_attempt(
    pool: &PgPool,
    settings: &Settings,
    student_id: &str,
    category_id: &str,
    difficulty_id: &str,
    requested_count: Option<i64>,
) -> Result<StartAttemptResponse, QuizError> {
    if let Some(existing) =
        repositories::attempts::find_by_quiz(pool, student_id, category_id, difficulty_id).await?
    {
        return resume(pool, existing).await;
    }

    let category = repositories::categories::find_by_id(pool, category_id).await?;
    let difficulty = repositories::difficulty_levels::find_by_id(pool, difficulty_id).await?;
    let available = matches!(
        (&category, &difficulty),
        (Some(category), Some(difficulty)) if category.is_active && difficulty.is_active
    );
    if !available {
        return Err(QuizError::QuizNotFound);
    }

    let quiz = settings.quiz();
    let count = effective_question_count(
        requested_count,
        quiz.default_question_count,
        quiz.max_question_count,
    );
    let question_ids =
        repositories::questions::sample_active_ids(pool, category_id, difficulty_id, count).await?;
    if question_ids.is_empty() {
        return Err(QuizError::NoQuestions);
    }

    let attempt_id = Uuid::new_v4().to_string();
    let created = repositories::attempts::create_if_absent(
        pool,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            student_id,
            category_id,
            difficulty_id,
            question_ids: &question_ids,
            started_at: primitive_now_utc(),
        },
    )
    .await?;

    let Some(attempt) = created else {
        // A concurrent start for the same quiz won the insert.
        let winner =
            repositories::attempts::find_by_quiz(pool, student_id, category_id, difficulty_id)
                .await?
                .ok_or(QuizError::AttemptNotFound)?;
        return resume(pool, winner).await;
    };

    tracing::info!(
        attempt_id = %attempt.id,
        student_id,
        category_id,
        difficulty_id,
        total_questions = attempt.total_questions,
        "Quiz attempt started"
    );
    metrics::record_attempt_event("started");

    let questions = question_views(pool, &attempt.question_ids).await?;
    Ok(StartAttemptResponse {
        attempt_id: attempt.id,
        total_questions: attempt.total_questions,
        started_at: format_primitive(attempt.started_at),
        questions,
        resumed: false,
    })
}

async fn resume(pool: &PgPool, attempt: QuizAttempt) -> Result<StartAttemptResponse, QuizError> {
    if attempt.is_completed {
        metrics::record_attempt_event("rejected");
        return Err(QuizError::AlreadyCompleted);
    }

    metrics::record_attempt_event("resumed");
    let questions = question_views(pool, &attempt.question_ids).await?;
    Ok(StartAttemptResponse {
        attempt_id: attempt.id,
        total_questions: attempt.total_questions,
        started_at: format_primitive(attempt.started_at),
        questions,
        resumed: true,
    })
}

async fn load_ordered(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<(Vec<Question>, HashMap<String, Vec<QuestionOption>>), sqlx::Error> {
    let mut by_id: HashMap<String, Question> =
        repositories::questions::find_by_ids(pool, question_ids)
            .await?
            .into_iter()
            .map(|question| (question.id.clone(), question))
            .collect();
    let ordered = question_ids.iter().filter_map(|id| by_id.remove(id)).collect();

    let mut options: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    for option in repositories::questions::list_options(pool, question_ids).await? {
        options.entry(option.question_id.clone()).or_default().push(option);
    }

    Ok((ordered, options))
}

async fn question_views(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<Vec<QuizQuestionView>, sqlx::Error> {
    let (questions, mut options) = load_ordered(pool, question_ids).await?;

    Ok(questions
        .into_iter()
        .map(|question| QuizQuestionView {
            options: options
                .remove(&question.id)
                .unwrap_or_default()
                .into_iter()
                .map(|option| QuizOptionView {
                    id: option.id,
                    option_text: option.option_text,
                    order_index: option.order_index,
                })
                .collect(),
            id: question.id,
            question_text: question.question_text,
            image_key: question.image_key,
            audio_key: question.audio_key,
        })
        .collect())
}

pub(crate) async fn submit_answers(
    pool: &PgPool,
    ctx: &RequestContext,
    attempt_id: &str,
    answers: &[SubmittedAnswer],
) -> Result<SubmitAnswersResponse, QuizError> {
    let mut tx = pool.begin().await?;

    let attempt = repositories::attempts::find_for_update(&mut *tx, attempt_id)
        .await?
        .ok_or(QuizError::AttemptNotFoundOrCompleted)?;
    if !ctx.owns(&attempt.student_id) {
        return Err(QuizError::Denied(Denied::NotOwner));
    }
    if attempt.is_completed {
        return Err(QuizError::AttemptNotFoundOrCompleted);
    }

    let assigned = &attempt.question_ids.0;
    let options = repositories::questions::list_options(&mut *tx, assigned).await?;
    let graded =
        grading::grade_submission(assigned, &options, answers).map_err(QuizError::InvalidSubmission)?;

    let now = primitive_now_utc();
    for answer in &graded.answers {
        repositories::answers::insert(
            &mut *tx,
            repositories::answers::CreateAnswer {
                id: &Uuid::new_v4().to_string(),
                attempt_id: &attempt.id,
                question_id: &answer.question_id,
                selected_option_id: answer.selected_option_id.as_deref(),
                is_correct: answer.is_correct,
                answered_at: now,
            },
        )
        .await?;
    }

    let completed = repositories::attempts::complete(
        &mut *tx,
        &attempt.id,
        graded.correct_answers,
        graded.score,
        now,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        attempt_id = %completed.id,
        student_id = %completed.student_id,
        correct_answers = completed.correct_answers,
        total_questions = completed.total_questions,
        score = graded.score,
        "Quiz attempt completed"
    );
    metrics::record_attempt_event("completed");
    metrics::record_attempt_score(graded.score);

    Ok(SubmitAnswersResponse {
        attempt_id: completed.id,
        correct_answers: completed.correct_answers,
        total_questions: completed.total_questions,
        score: graded.score,
    })
}

pub(crate) async fn get_results(
    pool: &PgPool,
    ctx: &RequestContext,
    attempt_id: &str,
) -> Result<QuizResultsResponse, QuizError> {
    let attempt = repositories::attempts::find_by_id(pool, attempt_id)
        .await?
        .ok_or(QuizError::AttemptNotFound)?;

    if !access_policy::can_read_attempt(ctx, &attempt.student_id) {
        return Err(QuizError::Denied(Denied::NotOwner));
    }
    if !attempt.is_completed {
        return Err(QuizError::NotCompleted);
    }

    let summary = repositories::attempts::find_summary(pool, &attempt.id)
        .await?
        .ok_or(QuizError::AttemptNotFound)?;

    let (questions, mut options) = load_ordered(pool, &attempt.question_ids).await?;
    let answers: HashMap<String, _> = repositories::answers::list_by_attempt(pool, &attempt.id)
        .await?
        .into_iter()
        .map(|answer| (answer.question_id.clone(), answer))
        .collect();

    let questions = questions
        .into_iter()
        .map(|question| {
            let answer = answers.get(&question.id);
            let selected = answer.and_then(|answer| answer.selected_option_id.clone());
            let options = options
                .remove(&question.id)
                .unwrap_or_default()
                .into_iter()
                .map(|option| OptionResult {
                    is_selected: selected.as_deref() == Some(option.id.as_str()),
                    id: option.id,
                    option_text: option.option_text,
                    order_index: option.order_index,
                    is_correct: option.is_correct,
                })
                .collect();

            QuestionResult {
                question_id: question.id,
                question_text: question.question_text,
                explanation: question.explanation,
                image_key: question.image_key,
                audio_key: question.audio_key,
                selected_option_id: selected,
                is_correct: answer.map(|answer| answer.is_correct).unwrap_or(false),
                options,
            }
        })
        .collect();

    Ok(QuizResultsResponse {
        attempt: AttemptHeader {
            id: attempt.id,
            student_id: attempt.student_id,
            category_id: summary.category_id,
            category_name: summary.category_name,
            difficulty_id: summary.difficulty_id,
            difficulty_name: summary.difficulty_name,
            total_questions: attempt.total_questions,
            correct_answers: attempt.correct_answers,
            score: attempt.score,
            is_completed: attempt.is_completed,
            started_at: format_primitive(attempt.started_at),
            completed_at: format_optional(attempt.completed_at),
        },
        questions,
    })
}

pub(crate) async fn student_progress(
    pool: &PgPool,
    settings: &Settings,
    student_id: &str,
) -> Result<StudentProgress, QuizError> {
    let completed =
        repositories::attempts::list_completed_by_student(pool, student_id).await?;
    let limit = settings.quiz().recent_attempts_limit.max(0) as usize;
    Ok(grading::summarize_progress(&completed, limit))
}

pub(crate) async fn available_quizzes(pool: &PgPool) -> Result<Vec<AvailableQuiz>, QuizError> {
    let rows = repositories::questions::list_available_quizzes(pool).await?;

    let mut quizzes: Vec<AvailableQuiz> = Vec::new();
    for row in rows {
        let difficulty = QuizDifficultyView {
            id: row.difficulty_id,
            name: row.difficulty_name,
            level_order: row.level_order,
            question_count: row.question_count,
        };

        match quizzes.last_mut() {
            Some(last) if last.category.id == row.category_id => last.difficulties.push(difficulty),
            _ => quizzes.push(AvailableQuiz {
                category: QuizCategoryView {
                    id: row.category_id,
                    name: row.category_name,
                    description: row.category_description,
                },
                difficulties: vec![difficulty],
            }),
        }
    }

    Ok(quizzes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_count_is_clamped() {
        assert_eq!(effective_question_count(None, 10, 50), 10);
        assert_eq!(effective_question_count(Some(0), 10, 50), 1);
        assert_eq!(effective_question_count(Some(-5), 10, 50), 1);
        assert_eq!(effective_question_count(Some(500), 10, 50), 50);
        assert_eq!(effective_question_count(Some(7), 10, 50), 7);
    }

    #[test]
    fn error_messages_match_domain_strings() {
        assert_eq!(QuizError::AlreadyCompleted.to_string(), "You have already completed this quiz");
        assert_eq!(
            QuizError::AttemptNotFoundOrCompleted.to_string(),
            "Quiz attempt not found or already completed"
        );
        assert_eq!(
            QuizError::InvalidSubmission("question q9 is not part of this attempt".into())
                .to_string(),
            "Invalid answer submission: question q9 is not part of this attempt"
        );
        assert_eq!(QuizError::Database(sqlx::Error::RowNotFound).to_string(), "Internal server error");
    }
}
