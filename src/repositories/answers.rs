use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::QuestionAnswer;

const COLUMNS: &str = "\
    id, response_id, question_id, option_id, answer_text, is_correct, points_earned";

/// One graded answer row, flattened for the UNNEST batch insert.
pub(crate) struct NewAnswer {
    pub(crate) question_id: i64,
    pub(crate) option_id: Option<i64>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points_earned: i32,
}

/// Writes every answer of a submission in a single statement.
pub(crate) async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    response_id: i64,
    answers: &[NewAnswer],
) -> Result<(), sqlx::Error> {
    if answers.is_empty() {
        return Ok(());
    }

    let question_ids: Vec<i64> = answers.iter().map(|a| a.question_id).collect();
    let option_ids: Vec<Option<i64>> = answers.iter().map(|a| a.option_id).collect();
    let texts: Vec<Option<String>> = answers.iter().map(|a| a.answer_text.clone()).collect();
    let correct: Vec<bool> = answers.iter().map(|a| a.is_correct).collect();
    let points: Vec<i32> = answers.iter().map(|a| a.points_earned).collect();

    sqlx::query(
        "INSERT INTO question_answers
             (response_id, question_id, option_id, answer_text, is_correct, points_earned)
         SELECT $1, q, o, t, c, p
         FROM UNNEST($2::BIGINT[], $3::BIGINT[], $4::TEXT[], $5::BOOLEAN[], $6::INT[])
             AS u(q, o, t, c, p)",
    )
    .bind(response_id)
    .bind(&question_ids)
    .bind(&option_ids)
    .bind(&texts)
    .bind(&correct)
    .bind(&points)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_response(
    pool: &PgPool,
    response_id: i64,
) -> Result<Vec<QuestionAnswer>, sqlx::Error> {
    sqlx::query_as::<_, QuestionAnswer>(&format!(
        "SELECT {COLUMNS} FROM question_answers WHERE response_id = $1 ORDER BY question_id, id"
    ))
    .bind(response_id)
    .fetch_all(pool)
    .await
}

/// How many submissions picked each option, across a whole survey.
pub(crate) async fn option_counts(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<(i64, i64, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.question_id, a.option_id, COUNT(*)
         FROM question_answers a
         JOIN survey_responses r ON r.id = a.response_id
         WHERE r.survey_id = $1 AND a.option_id IS NOT NULL
         GROUP BY a.question_id, a.option_id",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

/// Free-text answers grouped for the results view.
pub(crate) async fn text_answers(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<(i64, String)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.question_id, a.answer_text
         FROM question_answers a
         JOIN survey_responses r ON r.id = a.response_id
         WHERE r.survey_id = $1 AND a.answer_text IS NOT NULL
         ORDER BY a.question_id, a.id",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
}
