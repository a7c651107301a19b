use sqlx::PgPool;

use crate::db::models::Survey;

const COLUMNS: &str = "\
    id, title, description, user_id, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!("SELECT {COLUMNS} FROM surveys WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateSurvey<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) user_id: i64,
    pub(crate) is_active: bool,
}

pub(crate) async fn create(pool: &PgPool, survey: CreateSurvey<'_>) -> Result<Survey, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!(
        "INSERT INTO surveys (title, description, user_id, is_active)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(survey.title)
    .bind(survey.description)
    .bind(survey.user_id)
    .bind(survey.is_active)
    .fetch_one(pool)
    .await
}
