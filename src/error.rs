/*
 * Responsibility
 * - App-wide AppError
 * - IntoResponse (HTTP status / JSON error body)
 * - AuthorizationError and request-body errors funnel through here
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::services::auth::AuthorizationError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl ErrorResponse {
    pub fn new(
        code: &'static str,
        message: impl Into<String>,
        data: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                data,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Authorization(err) => return err.into_response(),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        (status, Json(ErrorResponse::new(code, message, None))).into_response()
    }
}
