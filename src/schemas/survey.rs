use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{Question, QuestionOption, Survey};
use crate::db::types::QuestionType;

/// Option as shown to a respondent. `is_correct` is deliberately absent.
#[derive(Debug, Serialize)]
pub(crate) struct OptionView {
    pub(crate) id: i64,
    pub(crate) option_text: String,
    pub(crate) order_index: i32,
}

impl From<&QuestionOption> for OptionView {
    fn from(option: &QuestionOption) -> Self {
        Self {
            id: option.id,
            option_text: option.option_text.clone(),
            order_index: option.order_index,
        }
    }
}

/// Question as shown to a respondent, with the answer key stripped.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: i64,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) is_required: bool,
    pub(crate) order_index: i32,
    pub(crate) points: i32,
    pub(crate) options: Vec<OptionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SurveyDetail {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) questions: Vec<QuestionView>,
}

impl SurveyDetail {
    pub(crate) fn assemble(
        survey: &Survey,
        questions: &[Question],
        options: &[QuestionOption],
    ) -> Self {
        let questions = questions
            .iter()
            .map(|question| QuestionView {
                id: question.id,
                question_text: question.question_text.clone(),
                question_type: question.question_type,
                is_required: question.is_required,
                order_index: question.order_index,
                points: question.points,
                options: options
                    .iter()
                    .filter(|o| o.question_id == question.id)
                    .map(OptionView::from)
                    .collect(),
            })
            .collect();

        Self {
            id: survey.id,
            title: survey.title.clone(),
            description: survey.description.clone(),
            is_active: survey.is_active,
            created_at: format_primitive(survey.created_at),
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionStat {
    pub(crate) option_id: i64,
    pub(crate) option_text: String,
    pub(crate) count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionStats {
    pub(crate) question_id: i64,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<OptionStat>,
    pub(crate) text_answers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SurveyResults {
    pub(crate) survey_id: i64,
    pub(crate) response_count: i64,
    pub(crate) is_quiz: bool,
    pub(crate) average_score: f64,
    pub(crate) max_score: i32,
    pub(crate) questions: Vec<QuestionStats>,
}
