use sqlx::PgPool;

use crate::db::models::QuestionOption;

const COLUMNS: &str = "\
    id, question_id, option_text, order_index, is_correct";

/// All options for every question of a survey, one round trip.
pub(crate) async fn list_by_survey(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(
        "SELECT o.id, o.question_id, o.option_text, o.order_index, o.is_correct
         FROM question_options o
         JOIN questions q ON q.id = o.question_id
         WHERE q.survey_id = $1
         ORDER BY o.question_id, o.order_index, o.id",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateOption<'a> {
    pub(crate) question_id: i64,
    pub(crate) option_text: &'a str,
    pub(crate) order_index: i32,
    pub(crate) is_correct: bool,
}

pub(crate) async fn create(
    pool: &PgPool,
    option: CreateOption<'_>,
) -> Result<QuestionOption, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "INSERT INTO question_options (question_id, option_text, order_index, is_correct)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(option.question_id)
    .bind(option.option_text)
    .bind(option.order_index)
    .bind(option.is_correct)
    .fetch_one(pool)
    .await
}
