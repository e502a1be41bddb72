//! Route trees and the assembled application router.

pub mod common;
pub mod student;

pub use common::common_routes;
pub use student::student_routes;

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::response::failure;
use crate::state::AppState;
use axum::{
    body::to_bytes,
    http::{header, HeaderValue, StatusCode},
    middleware::map_response,
    response::Response,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub const API_PREFIX: &str = "/api/v1";

/// Largest plain-text error body carried over into the envelope message.
const PLAIN_ERROR_LIMIT: usize = 4096;

/// `/api/v1/health` and `/api/v1/student/...`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(common::health))
        .nest("/student", student_routes())
}

async fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "Route not found".to_string())
}

/// Rewrites error responses produced outside the handlers (body limit,
/// method mismatch, extractor rejections) into the JSON envelope.
async fn wrap_plain_errors(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !(status.is_client_error() || status.is_server_error()) || is_json {
        return response;
    }
    let (parts, body) = response.into_parts();
    let text = to_bytes(body, PLAIN_ERROR_LIMIT)
        .await
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    };
    let mut wrapped = failure(status, message);
    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            wrapped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    wrapped
}

fn cors(config: &ServerConfig) -> Result<CorsLayer, ConfigError> {
    let Some(origin) = &config.cors_origin else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
        key: crate::config::CORS_ORIGIN,
        value: origin.clone(),
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Full application: API under `/api/v1`, common probes at the root, optional
/// static bundle as fallback, and the HTTP layer stack.
pub fn app(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let router = Router::new()
        .merge(common_routes())
        .nest(API_PREFIX, api_routes());
    let router = match &config.static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            router.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => router.fallback(not_found),
    };
    Ok(router
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(map_response(wrap_plain_errors))
        .layer(cors(config)?)
        .layer(TraceLayer::new_for_http()))
}
