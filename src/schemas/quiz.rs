use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Uniform RPC reply: `{success: true, data}` or `{success: false, error}`.
#[derive(Debug, Serialize)]
pub(crate) struct RpcEnvelope<T: Serialize> {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl<T: Serialize> RpcEnvelope<T> {
    pub(crate) fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub(crate) fn err(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EmailLookupRequest {
    #[validate(length(min = 1, max = 100, message = "username must not be empty"))]
    pub(crate) username: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmailLookupResponse {
    pub(crate) email: String,
    pub(crate) user_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StartAttemptRequest {
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
    #[serde(alias = "categoryId")]
    #[validate(length(min = 1, message = "category_id must not be empty"))]
    pub(crate) category_id: String,
    #[serde(alias = "difficultyId")]
    #[validate(length(min = 1, message = "difficulty_id must not be empty"))]
    pub(crate) difficulty_id: String,
    #[serde(default)]
    #[serde(alias = "questionCount")]
    pub(crate) question_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuizOptionView {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) order_index: i32,
}

/// Question as served to a student taking the quiz; correctness is withheld.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuizQuestionView {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) image_key: Option<String>,
    pub(crate) audio_key: Option<String>,
    pub(crate) options: Vec<QuizOptionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) questions: Vec<QuizQuestionView>,
    pub(crate) total_questions: i32,
    pub(crate) started_at: String,
    pub(crate) resumed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubmittedAnswer {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "selectedOptionId")]
    pub(crate) selected_option_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswersRequest {
    #[serde(alias = "attemptId")]
    #[validate(length(min = 1, message = "attempt_id must not be empty"))]
    pub(crate) attempt_id: String,
    #[serde(default)]
    pub(crate) answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAnswersResponse {
    pub(crate) attempt_id: String,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) score: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptRequest {
    #[serde(alias = "attemptId")]
    #[validate(length(min = 1, message = "attempt_id must not be empty"))]
    pub(crate) attempt_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptHeader {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) category_id: String,
    pub(crate) category_name: String,
    pub(crate) difficulty_id: String,
    pub(crate) difficulty_name: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) score: Option<f64>,
    pub(crate) is_completed: bool,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResult {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) order_index: i32,
    pub(crate) is_correct: bool,
    pub(crate) is_selected: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResult {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) explanation: Option<String>,
    pub(crate) image_key: Option<String>,
    pub(crate) audio_key: Option<String>,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) options: Vec<OptionResult>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResultsResponse {
    pub(crate) attempt: AttemptHeader,
    pub(crate) questions: Vec<QuestionResult>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProgressRequest {
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryStats {
    pub(crate) attempts: i64,
    pub(crate) average_score: f64,
    pub(crate) best_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecentAttempt {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) category_name: String,
    pub(crate) difficulty_id: String,
    pub(crate) difficulty_name: String,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) score: f64,
    pub(crate) completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentProgress {
    pub(crate) total_attempts: i64,
    pub(crate) average_score: f64,
    pub(crate) best_score: f64,
    pub(crate) category_stats: BTreeMap<String, CategoryStats>,
    pub(crate) recent_attempts: Vec<RecentAttempt>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizCategoryView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizDifficultyView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) level_order: i32,
    pub(crate) question_count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AvailableQuiz {
    pub(crate) category: QuizCategoryView,
    pub(crate) difficulties: Vec<QuizDifficultyView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let ok = serde_json::to_value(RpcEnvelope::ok(serde_json::json!({"a": 1}))).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": {"a": 1}}));

        let err = serde_json::to_value(RpcEnvelope::<()>::err("Username not found")).unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "Username not found"}));
    }

    #[test]
    fn empty_progress_serializes_with_camel_case_keys() {
        let progress = StudentProgress {
            total_attempts: 0,
            average_score: 0.0,
            best_score: 0.0,
            category_stats: BTreeMap::new(),
            recent_attempts: Vec::new(),
        };
        let value = serde_json::to_value(progress).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "totalAttempts": 0,
                "averageScore": 0.0,
                "bestScore": 0.0,
                "categoryStats": {},
                "recentAttempts": []
            })
        );
    }

    #[test]
    fn submit_request_accepts_null_selection() {
        let payload: SubmitAnswersRequest = serde_json::from_value(serde_json::json!({
            "attempt_id": "a1",
            "answers": [
                {"question_id": "q1", "selected_option_id": "o1"},
                {"questionId": "q2", "selectedOptionId": null}
            ]
        }))
        .unwrap();
        assert_eq!(payload.answers.len(), 2);
        assert_eq!(payload.answers[1].question_id, "q2");
        assert!(payload.answers[1].selected_option_id.is_none());
    }
}
