mod handlers;

use axum::{routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/get_email_from_username", post(handlers::get_email_from_username))
        .route("/start_quiz_attempt", post(handlers::start_quiz_attempt))
        .route("/submit_quiz_answers", post(handlers::submit_quiz_answers))
        .route("/get_quiz_results", post(handlers::get_quiz_results))
        .route("/get_student_progress", post(handlers::get_student_progress))
        .route("/get_available_quizzes", post(handlers::get_available_quizzes))
}
