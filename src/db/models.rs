use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::QuestionType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) is_admin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Survey {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) user_id: i64,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: i64,
    pub(crate) survey_id: i64,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) is_required: bool,
    pub(crate) order_index: i32,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) id: i64,
    pub(crate) question_id: i64,
    pub(crate) option_text: String,
    pub(crate) order_index: i32,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SurveyResponse {
    pub(crate) id: i64,
    pub(crate) survey_id: i64,
    pub(crate) user_id: Option<i64>,
    pub(crate) ip_address: Option<String>,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionAnswer {
    pub(crate) id: i64,
    pub(crate) response_id: i64,
    pub(crate) question_id: i64,
    pub(crate) option_id: Option<i64>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points_earned: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SurveyRetake {
    pub(crate) id: i64,
    pub(crate) survey_id: i64,
    pub(crate) user_id: i64,
    pub(crate) granted_by: i64,
    pub(crate) granted_at: PrimitiveDateTime,
    pub(crate) used_at: Option<PrimitiveDateTime>,
}
