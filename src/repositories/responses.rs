use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::SurveyResponse;

const COLUMNS: &str = "\
    id, survey_id, user_id, ip_address, total_score, max_score, created_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: i64,
) -> Result<Option<SurveyResponse>, sqlx::Error> {
    sqlx::query_as::<_, SurveyResponse>(&format!(
        "SELECT {COLUMNS} FROM survey_responses WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_survey(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<SurveyResponse>, sqlx::Error> {
    sqlx::query_as::<_, SurveyResponse>(&format!(
        "SELECT {COLUMNS} FROM survey_responses WHERE survey_id = $1 ORDER BY created_at, id"
    ))
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

/// Whether a user already has a recorded response for the survey.
///
/// Takes any executor so the orchestrator can re-check inside the
/// submission transaction after taking the advisory lock.
pub(crate) async fn user_has_responded<'e, E>(
    executor: E,
    survey_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT 1::BIGINT FROM survey_responses WHERE survey_id = $1 AND user_id = $2 LIMIT 1",
    )
    .bind(survey_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(exists.is_some())
}

/// Serializes concurrent submissions for the same (survey, user) pair.
///
/// Transaction-scoped advisory lock, released automatically on commit or
/// rollback. The key folds both ids into the single bigint keyspace.
pub(crate) async fn lock_submission(
    tx: &mut Transaction<'_, Postgres>,
    survey_id: i64,
    user_id: i64,
) -> Result<(), sqlx::Error> {
    let key = (survey_id.wrapping_shl(32)) ^ user_id;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(key)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Inserts the response row before any answers exist. Scores start at
/// zero and are finalized by `update_score` in the same transaction.
pub(crate) async fn insert_shell(
    tx: &mut Transaction<'_, Postgres>,
    survey_id: i64,
    user_id: Option<i64>,
    ip_address: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO survey_responses (survey_id, user_id, ip_address)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(survey_id)
    .bind(user_id)
    .bind(ip_address)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn update_score(
    tx: &mut Transaction<'_, Postgres>,
    response_id: i64,
    total_score: i32,
    max_score: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE survey_responses SET total_score = $2, max_score = $3 WHERE id = $1")
        .bind(response_id)
        .bind(total_score)
        .bind(max_score)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn count_by_survey(pool: &PgPool, survey_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE survey_id = $1")
        .bind(survey_id)
        .fetch_one(pool)
        .await
}
