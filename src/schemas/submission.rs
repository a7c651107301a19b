use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::submission::SubmissionOutcome;

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitSurveyRequest {
    /// Raw answers keyed by question id; values are typed per question
    /// during validation.
    #[serde(default)]
    pub(crate) answers: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitData {
    pub(crate) response_id: i64,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) is_quiz: bool,
    pub(crate) percentage: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) data: SubmitData,
}

impl From<SubmissionOutcome> for SubmitResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            data: SubmitData {
                response_id: outcome.response_id,
                total_score: outcome.total_score,
                max_score: outcome.max_score,
                is_quiz: outcome.is_quiz,
                percentage: outcome.percentage,
            },
        }
    }
}
