use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Feedback, StudentFeedback};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FeedbackCreate {
    #[serde(alias = "attemptId")]
    pub(crate) attempt_id: String,
    #[validate(length(min = 1, max = 5000, message = "message must be 1-5000 characters"))]
    pub(crate) message: String,
    #[serde(default)]
    #[serde(alias = "attachmentKey")]
    pub(crate) attachment_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) tutor_id: String,
    pub(crate) student_id: String,
    pub(crate) message: String,
    pub(crate) attachment_key: Option<String>,
    pub(crate) is_read: bool,
    pub(crate) created_at: String,
}

impl FeedbackResponse {
    pub(crate) fn from_db(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            attempt_id: feedback.attempt_id,
            tutor_id: feedback.tutor_id,
            student_id: feedback.student_id,
            message: feedback.message,
            attachment_key: feedback.attachment_key,
            is_read: feedback.is_read,
            created_at: format_primitive(feedback.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentFeedbackResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) message: String,
    pub(crate) attachment_key: Option<String>,
    pub(crate) is_resolved: bool,
    pub(crate) resolved_by: Option<String>,
    pub(crate) created_at: String,
}

impl StudentFeedbackResponse {
    pub(crate) fn from_db(feedback: StudentFeedback) -> Self {
        Self {
            id: feedback.id,
            attempt_id: feedback.attempt_id,
            student_id: feedback.student_id,
            message: feedback.message,
            attachment_key: feedback.attachment_key,
            is_resolved: feedback.is_resolved,
            resolved_by: feedback.resolved_by,
            created_at: format_primitive(feedback.created_at),
        }
    }
}
