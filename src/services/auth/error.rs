/*
 * Responsibility
 * - AuthorizationError: the single normalized rejection type of the gate
 * - ErrorKind → HTTP status / machine-readable code
 *
 * Notes
 * - `debug` data is for logs only; `public` data is what the client may see
 * - Neither ever contains the raw credential (see sanitize.rs)
 */
use std::collections::BTreeSet;
use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::verifier::Permission;
use crate::error::ErrorResponse;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MissingCredential,
    WrongScheme,
    InvalidCredential,
    SubjectLocked,
    ScopeConflict,
    CustomValidationFailed,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::WrongScheme => "WRONG_SCHEME",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::SubjectLocked => "SUBJECT_LOCKED",
            Self::ScopeConflict => "SCOPE_CONFLICT",
            Self::CustomValidationFailed => "CUSTOM_VALIDATION_FAILED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::WrongScheme => StatusCode::BAD_REQUEST,
            Self::SubjectLocked | Self::CustomValidationFailed => StatusCode::FORBIDDEN,
            Self::ScopeConflict => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{description}: {details}")]
pub struct AuthorizationError {
    kind: ErrorKind,
    description: &'static str,
    details: String,
    debug: Map<String, Value>,
    public: Map<String, Value>,
    #[source]
    source: Option<BoxError>,
}

impl AuthorizationError {
    fn new(kind: ErrorKind, description: &'static str, details: impl Into<String>) -> Self {
        Self {
            kind,
            description,
            details: details.into(),
            debug: Map::new(),
            public: Map::new(),
            source: None,
        }
    }

    fn with_debug(mut self, key: &str, value: Value) -> Self {
        self.debug.insert(key.to_owned(), value);
        self
    }

    fn with_public(mut self, key: &str, value: Value) -> Self {
        self.public.insert(key.to_owned(), value);
        self
    }

    fn with_source(mut self, source: BoxError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn missing_credential() -> Self {
        Self::new(
            ErrorKind::MissingCredential,
            "Missing Authorization Header",
            "Expected header to be: Bearer <token>",
        )
    }

    pub fn wrong_scheme(scheme: &str) -> Self {
        Self::new(
            ErrorKind::WrongScheme,
            "Invalid Authorization Header",
            "Expected header to be: Bearer",
        )
        .with_public("type", json!(scheme))
    }

    /// `fingerprint` must already be sanitized.
    pub fn invalid_credential(fingerprint: &str, cause: BoxError) -> Self {
        Self::new(
            ErrorKind::InvalidCredential,
            "Invalid Bearer Token",
            "Token verification failed",
        )
        .with_debug("token", json!(fingerprint))
        .with_debug("verifier_error", json!(cause.to_string()))
        .with_source(cause)
    }

    pub fn subject_locked(subject: &str, permission: Permission) -> Self {
        Self::new(
            ErrorKind::SubjectLocked,
            "Invalid Bearer Token",
            "Subject is locked",
        )
        .with_public("subject", json!(subject))
        .with_public("permission", json!(permission))
    }

    pub fn scope_conflict(missing: &str, required: &[String], actual: &BTreeSet<String>) -> Self {
        Self::new(
            ErrorKind::ScopeConflict,
            "Invalid Bearer Token",
            format!("Missing required scope: {missing}"),
        )
        .with_public("missing", json!(missing))
        .with_public("required", json!(required))
        .with_public("actual", json!(actual))
    }

    pub fn custom_validation_failed(cause: BoxError) -> Self {
        Self::new(
            ErrorKind::CustomValidationFailed,
            "Invalid Bearer Token",
            "Custom validation failed",
        )
        .with_debug("validation_error", json!(cause.to_string()))
        .with_source(cause)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        self.description
    }

    pub fn debug_data(&self) -> &Map<String, Value> {
        &self.debug
    }

    pub fn public_data(&self) -> &Map<String, Value> {
        &self.public
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        let data = (!self.public.is_empty()).then_some(self.public);
        let body = ErrorResponse::new(self.kind.code(), self.description, data);

        (self.kind.status(), axum::Json(body)).into_response()
    }
}
