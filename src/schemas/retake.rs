use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::SurveyRetake;

#[derive(Debug, Deserialize)]
pub(crate) struct RetakeGrantRequest {
    pub(crate) user_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RetakeView {
    pub(crate) id: i64,
    pub(crate) survey_id: i64,
    pub(crate) user_id: i64,
    pub(crate) granted_by: i64,
    pub(crate) granted_at: String,
    pub(crate) used_at: Option<String>,
}

impl From<&SurveyRetake> for RetakeView {
    fn from(retake: &SurveyRetake) -> Self {
        Self {
            id: retake.id,
            survey_id: retake.survey_id,
            user_id: retake.user_id,
            granted_by: retake.granted_by,
            granted_at: format_primitive(retake.granted_at),
            used_at: retake.used_at.map(format_primitive),
        }
    }
}
