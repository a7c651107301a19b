use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);

/// Authenticated user if a valid bearer token is present, `None`
/// otherwise. Submission endpoints accept anonymous respondents.
pub(crate) struct OptionalUser(pub(crate) Option<User>);

pub(crate) struct CurrentAdmin(pub(crate) User);

async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<User, ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

    let claims = security::verify_token(token, app_state.settings())
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

    let user = repositories::users::find_by_id(app_state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("User not found"));
    };

    if !user.is_active {
        return Err(ApiError::Unauthorized("Invalid authentication credentials"));
    }

    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.get(header::AUTHORIZATION).is_none() {
            return Ok(OptionalUser(None));
        }
        // A header was sent, so a bad token is an error rather than an
        // anonymous fallback.
        authenticate(parts, state).await.map(|user| OptionalUser(Some(user)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.is_admin {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Survey owners and admins may manage retakes and read results.
pub(crate) fn require_survey_manager(user: &User, survey_owner_id: i64) -> Result<(), ApiError> {
    if user.is_admin || user.id == survey_owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this survey".to_string()))
    }
}
