use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Category, DifficultyLevel, Question, QuestionOption};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CategoryCreate {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CategoryUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DifficultyCreate {
    #[validate(length(min = 1, max = 50, message = "name must be 1-50 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "levelOrder")]
    #[validate(range(min = 0, message = "level_order must be non-negative"))]
    pub(crate) level_order: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DifficultyUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "name must be 1-50 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "levelOrder")]
    #[validate(range(min = 0, message = "level_order must be non-negative"))]
    pub(crate) level_order: Option<i32>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionCreate {
    #[serde(alias = "optionText")]
    #[validate(length(min = 1, message = "option_text must not be empty"))]
    pub(crate) option_text: String,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    pub(crate) order_index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionUpdate {
    #[serde(default)]
    #[serde(alias = "optionText")]
    #[validate(length(min = 1, message = "option_text must not be empty"))]
    pub(crate) option_text: Option<String>,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: Option<bool>,
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    pub(crate) order_index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "categoryId")]
    pub(crate) category_id: String,
    #[serde(alias = "difficultyId")]
    pub(crate) difficulty_id: String,
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    #[serde(alias = "imageKey")]
    pub(crate) image_key: Option<String>,
    #[serde(default)]
    #[serde(alias = "audioKey")]
    pub(crate) audio_key: Option<String>,
    #[validate(nested)]
    pub(crate) options: Vec<OptionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[serde(alias = "categoryId")]
    pub(crate) category_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "difficultyId")]
    pub(crate) difficulty_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    #[serde(alias = "imageKey")]
    pub(crate) image_key: Option<String>,
    #[serde(default)]
    #[serde(alias = "audioKey")]
    pub(crate) audio_key: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CategoryResponse {
    pub(crate) fn from_db(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            is_active: category.is_active,
            created_at: format_primitive(category.created_at),
            updated_at: format_primitive(category.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DifficultyResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) level_order: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl DifficultyResponse {
    pub(crate) fn from_db(level: DifficultyLevel) -> Self {
        Self {
            id: level.id,
            name: level.name,
            description: level.description,
            level_order: level.level_order,
            is_active: level.is_active,
            created_at: format_primitive(level.created_at),
            updated_at: format_primitive(level.updated_at),
        }
    }
}

/// Staff view of an option, including correctness.
#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
}

impl OptionResponse {
    pub(crate) fn from_db(option: QuestionOption) -> Self {
        Self {
            id: option.id,
            option_text: option.option_text,
            is_correct: option.is_correct,
            order_index: option.order_index,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) difficulty_id: String,
    pub(crate) question_text: String,
    pub(crate) explanation: Option<String>,
    pub(crate) image_key: Option<String>,
    pub(crate) audio_key: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) options: Vec<OptionResponse>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            category_id: question.category_id,
            difficulty_id: question.difficulty_id,
            question_text: question.question_text,
            explanation: question.explanation,
            image_key: question.image_key,
            audio_key: question.audio_key,
            is_active: question.is_active,
            created_by: question.created_by,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
            options: options.into_iter().map(OptionResponse::from_db).collect(),
        }
    }
}
