//! Typed errors and HTTP mapping.

use crate::response::{failure, validation_failure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// One field-level validation failure, as reported to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, value: Option<serde_json::Value>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
            value,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    /// Domain validation (missing or blank fields after normalisation).
    #[error("{0}")]
    Validation(String),
    /// Request shape validation with per-field details.
    #[error("Validation failed")]
    InvalidRequest(Vec<FieldError>),
    /// A unique key is already taken; message names the field.
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidRequest(_)
            | AppError::Duplicate(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Db(_) | AppError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render as the standard envelope. Server-side failures carry `failure_message`
    /// unless `expose_detail` is set, in which case the underlying error text is sent.
    pub fn into_envelope(self, failure_message: &str, expose_detail: bool) -> Response {
        let status = self.status();
        match self {
            AppError::InvalidRequest(errors) => validation_failure(errors),
            e if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED => {
                tracing::error!(error = %e, "{}", failure_message);
                if expose_detail {
                    failure(status, e.to_string())
                } else {
                    failure(status, failure_message.to_string())
                }
            }
            e => {
                tracing::warn!(status = %status, error = %e, "request rejected");
                failure(status, e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_envelope("An unexpected error occurred", false)
    }
}
