use crate::core::security;
use crate::core::state::AppState;
use crate::repositories;

pub(crate) async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let username = &admin.first_admin_username;

    let user = repositories::users::find_by_username(state.db(), username).await?;

    if let Some(user) = user {
        let verified = security::verify_password(&admin.first_admin_password, &user.hashed_password)
            .unwrap_or(false);

        if verified && user.is_admin && user.is_active {
            tracing::info!("Default admin already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            user.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_admin_password)?
        };

        sqlx::query(
            "UPDATE users SET hashed_password = $1, is_admin = TRUE, is_active = TRUE WHERE id = $2",
        )
        .bind(hashed_password)
        .bind(user.id)
        .execute(state.db())
        .await?;

        tracing::info!("Updated default admin {username}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_admin_password)?;

    sqlx::query(
        "INSERT INTO users (username, hashed_password, full_name, is_admin, is_active)
         VALUES ($1, $2, $3, TRUE, TRUE)",
    )
    .bind(username)
    .bind(hashed_password)
    .bind("Administrator")
    .execute(state.db())
    .await?;

    tracing::info!("Created default admin {username}");
    Ok(())
}
