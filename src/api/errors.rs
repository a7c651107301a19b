use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: serde_json::Value,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(String),
    /// Validation failures carry the full error list, not just the first.
    UnprocessableEntity(Vec<String>),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

fn json_error(status: StatusCode, detail: serde_json::Value) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let mut response =
                    json_error(StatusCode::UNAUTHORIZED, serde_json::Value::from(message));
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                json_error(StatusCode::FORBIDDEN, serde_json::Value::from(message))
            }
            ApiError::UnprocessableEntity(errors) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, serde_json::json!(errors))
            }
            ApiError::NotFound(message) => {
                json_error(StatusCode::NOT_FOUND, serde_json::Value::from(message))
            }
            ApiError::Conflict(message) => {
                json_error(StatusCode::CONFLICT, serde_json::Value::from(message))
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, serde_json::Value::from(message))
            }
        }
    }
}
