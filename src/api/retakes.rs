use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_survey_manager, CurrentUser};
use crate::core::state::AppState;
use crate::db::models::{Survey, User};
use crate::repositories::{retakes, surveys, users};
use crate::schemas::retake::{RetakeGrantRequest, RetakeView};

async fn load_managed_survey(
    state: &AppState,
    survey_id: i64,
    user: &User,
) -> Result<Survey, ApiError> {
    let survey = surveys::find_by_id(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load survey"))?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;
    require_survey_manager(user, survey.user_id)?;
    Ok(survey)
}

pub(crate) async fn grant(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<RetakeGrantRequest>,
) -> Result<(StatusCode, Json<RetakeView>), ApiError> {
    load_managed_survey(&state, survey_id, &user).await?;

    let grantee = users::find_by_id(state.db(), payload.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;
    if grantee.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let retake = retakes::grant(state.db(), survey_id, payload.user_id, user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to grant retake"))?
        .ok_or_else(|| {
            ApiError::Conflict("User already has an unused retake for this survey".to_string())
        })?;

    Ok((StatusCode::CREATED, Json(RetakeView::from(&retake))))
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<RetakeView>>, ApiError> {
    load_managed_survey(&state, survey_id, &user).await?;

    let grants = retakes::list_by_survey(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list retakes"))?;

    Ok(Json(grants.iter().map(RetakeView::from).collect()))
}

pub(crate) async fn revoke(
    State(state): State<AppState>,
    Path((survey_id, user_id)): Path<(i64, i64)>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    load_managed_survey(&state, survey_id, &user).await?;

    // Consumed grants stay for the audit trail; only unused ones can go.
    let removed = retakes::revoke_active(state.db(), survey_id, user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to revoke retake"))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("No active retake for this user".to_string()))
    }
}
