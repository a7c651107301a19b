use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::auth::{TokenResponse, UserLogin, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", post(login)).route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = repositories::users::find_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let valid = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|e| ApiError::internal(e, "Failed to verify password"))?;
    if !valid {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("Inactive user"));
    }

    let access_token = security::create_access_token(&user.id.to_string(), state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to issue access token"))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserResponse::from(&user),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
