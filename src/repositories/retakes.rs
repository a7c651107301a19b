use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::SurveyRetake;

const COLUMNS: &str = "\
    id, survey_id, user_id, granted_by, granted_at, used_at";

/// Grants a retake, or returns `None` when an unused grant already exists.
/// The partial unique index on active grants backs the ON CONFLICT arm.
pub(crate) async fn grant(
    pool: &PgPool,
    survey_id: i64,
    user_id: i64,
    granted_by: i64,
) -> Result<Option<SurveyRetake>, sqlx::Error> {
    sqlx::query_as::<_, SurveyRetake>(&format!(
        "INSERT INTO survey_retakes (survey_id, user_id, granted_by)
         VALUES ($1, $2, $3)
         ON CONFLICT (survey_id, user_id) WHERE used_at IS NULL DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(survey_id)
    .bind(user_id)
    .bind(granted_by)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn has_active<'e, E>(
    executor: E,
    survey_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT 1::BIGINT FROM survey_retakes
         WHERE survey_id = $1 AND user_id = $2 AND used_at IS NULL
         LIMIT 1",
    )
    .bind(survey_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(exists.is_some())
}

/// Marks the active grant used. Returns `false` when no unused grant was
/// there to consume, which callers treat as a lost race.
pub(crate) async fn consume_active(
    tx: &mut Transaction<'_, Postgres>,
    survey_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE survey_retakes SET used_at = now()
         WHERE survey_id = $1 AND user_id = $2 AND used_at IS NULL",
    )
    .bind(survey_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Deletes the active grant. Used grants stay for the audit trail.
pub(crate) async fn revoke_active(
    pool: &PgPool,
    survey_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM survey_retakes WHERE survey_id = $1 AND user_id = $2 AND used_at IS NULL",
    )
    .bind(survey_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn list_by_survey(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<SurveyRetake>, sqlx::Error> {
    sqlx::query_as::<_, SurveyRetake>(&format!(
        "SELECT {COLUMNS} FROM survey_retakes WHERE survey_id = $1 ORDER BY granted_at DESC, id DESC"
    ))
    .bind(survey_id)
    .fetch_all(pool)
    .await
}
