//! Standard response envelope helpers: `{success, data, message, timestamp}`.

use crate::error::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> Envelope<T> {
    fn new(success: bool, data: T, message: String) -> Self {
        Envelope {
            success,
            data,
            message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            errors: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaCount {
    pub count: u64,
}

/// Pagination block returned next to a page of records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// `limit` must be non-zero.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        PageMeta {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
            has_next: page.saturating_mul(limit) < total,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

pub fn success<T: Serialize>(status: StatusCode, data: T, message: &str) -> Response {
    (status, Json(Envelope::new(true, data, message.to_string()))).into_response()
}

pub fn failure(status: StatusCode, message: String) -> Response {
    (status, Json(Envelope::new(false, serde_json::Value::Null, message))).into_response()
}

pub fn validation_failure(errors: Vec<FieldError>) -> Response {
    let mut body = Envelope::new(false, serde_json::Value::Null, "Validation failed".to_string());
    body.errors = Some(errors);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
