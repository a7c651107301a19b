use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_survey_manager, CurrentUser, OptionalUser};
use crate::api::retakes;
use crate::core::state::AppState;
use crate::repositories::{answers, options, questions, responses, surveys};
use crate::schemas::submission::{SubmitResponse, SubmitSurveyRequest};
use crate::schemas::survey::{OptionStat, QuestionStats, SurveyDetail, SurveyResults};
use crate::services::grading;
use crate::services::submission::{self, SubmitError};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:survey_id", get(get_survey))
        .route("/:survey_id/submit", post(submit))
        .route("/:survey_id/results", get(results))
        .route("/:survey_id/retakes", post(retakes::grant).get(retakes::list))
        .route("/:survey_id/retakes/:user_id", axum::routing::delete(retakes::revoke))
}

async fn get_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
) -> Result<Json<SurveyDetail>, ApiError> {
    let survey = surveys::find_by_id(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load survey"))?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;

    if !survey.is_active {
        return Err(ApiError::Forbidden("Survey is not accepting responses".to_string()));
    }

    let question_list = questions::list_by_survey(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let option_list = options::list_by_survey(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load options"))?;

    Ok(Json(SurveyDetail::assemble(&survey, &question_list, &option_list)))
}

async fn submit(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Json(payload): Json<SubmitSurveyRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let ip = client_ip(&headers);
    let actor = user.map(|u| u.id);

    let outcome = submission::submit(state.db(), survey_id, actor, ip, &payload.answers)
        .await
        .map_err(|err| match err {
            SubmitError::Invalid(errors) => ApiError::UnprocessableEntity(errors),
            SubmitError::SurveyNotFound => ApiError::NotFound("Survey not found".to_string()),
            SubmitError::SurveyInactive => {
                ApiError::Forbidden("Survey is not accepting responses".to_string())
            }
            SubmitError::AlreadyResponded => {
                ApiError::Conflict("You have already completed this survey".to_string())
            }
            SubmitError::Persistence(_) => {
                ApiError::Internal("Failed to save response".to_string())
            }
        })?;

    Ok((StatusCode::CREATED, Json(SubmitResponse::from(outcome))))
}

async fn results(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SurveyResults>, ApiError> {
    let survey = surveys::find_by_id(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load survey"))?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))?;
    require_survey_manager(&user, survey.user_id)?;

    let question_list = questions::list_by_survey(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let option_list = options::list_by_survey(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load options"))?;
    let response_list = responses::list_by_survey(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load responses"))?;
    let counts = answers::option_counts(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to aggregate answers"))?;
    let texts = answers::text_answers(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to aggregate answers"))?;

    let mut count_by_option: HashMap<(i64, i64), i64> = HashMap::new();
    for (question_id, option_id, count) in counts {
        count_by_option.insert((question_id, option_id), count);
    }
    let mut texts_by_question: HashMap<i64, Vec<String>> = HashMap::new();
    for (question_id, text) in texts {
        texts_by_question.entry(question_id).or_default().push(text);
    }

    let question_stats = question_list
        .iter()
        .map(|question| QuestionStats {
            question_id: question.id,
            question_text: question.question_text.clone(),
            question_type: question.question_type,
            options: option_list
                .iter()
                .filter(|o| o.question_id == question.id)
                .map(|o| OptionStat {
                    option_id: o.id,
                    option_text: o.option_text.clone(),
                    count: count_by_option.get(&(question.id, o.id)).copied().unwrap_or(0),
                })
                .collect(),
            text_answers: texts_by_question.remove(&question.id).unwrap_or_default(),
        })
        .collect();

    let response_count = response_list.len() as i64;
    let average_score = if response_count > 0 {
        let sum: i64 = response_list.iter().map(|r| i64::from(r.total_score)).sum();
        let raw = sum as f64 / response_count as f64;
        (raw * 10.0).round() / 10.0
    } else {
        0.0
    };

    Ok(Json(SurveyResults {
        survey_id,
        response_count,
        is_quiz: grading::is_quiz(&question_list, &option_list),
        average_score,
        max_score: grading::max_score(&question_list),
        questions: question_stats,
    }))
}

#[cfg(test)]
mod tests;

/// Best-effort client address from proxy headers. Anonymous analytics
/// only, never used for dedup.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
