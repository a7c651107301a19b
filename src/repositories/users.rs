use sqlx::PgPool;

use crate::db::models::User;

const COLUMNS: &str = "\
    id, username, hashed_password, full_name, is_admin, is_active, created_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) username: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) full_name: &'a str,
    pub(crate) is_admin: bool,
    pub(crate) is_active: bool,
}

pub(crate) async fn create(pool: &PgPool, user: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, hashed_password, full_name, is_admin, is_active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(user.username)
    .bind(&user.hashed_password)
    .bind(user.full_name)
    .bind(user.is_admin)
    .bind(user.is_active)
    .fetch_one(pool)
    .await
}
