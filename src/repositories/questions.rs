use sqlx::PgPool;

use crate::db::models::Question;
use crate::db::types::QuestionType;

const COLUMNS: &str = "\
    id, survey_id, question_text, question_type, is_required, order_index, \
    points, correct_answer";

pub(crate) async fn list_by_survey(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE survey_id = $1 ORDER BY order_index, id"
    ))
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) survey_id: i64,
    pub(crate) question_text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) is_required: bool,
    pub(crate) order_index: i32,
    pub(crate) points: i32,
    pub(crate) correct_answer: Option<&'a str>,
}

pub(crate) async fn create(
    pool: &PgPool,
    question: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions
             (survey_id, question_text, question_type, is_required, order_index,
              points, correct_answer)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(question.survey_id)
    .bind(question.question_text)
    .bind(question.question_type)
    .bind(question.is_required)
    .bind(question.order_index)
    .bind(question.points)
    .bind(question.correct_answer)
    .fetch_one(pool)
    .await
}
