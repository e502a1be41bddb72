//! Generic resource handlers: list, read, create, update, delete, count, bulk.
//!
//! Each function takes the repository and a [`ResourceHooks`] value explicitly,
//! catches every error, and renders the standard envelope.

use crate::case::{to_camel_case, to_snake_case};
use crate::error::{AppError, FieldError};
use crate::resource::{Column, ColumnKind, Resource};
use crate::response::{success, MetaCount};
use crate::service::Repository;
use crate::sql::{Fields, Filter, QueryOptions};
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::Response, Json};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Maximum rows accepted by one bulk create.
pub const BULK_LIMIT: usize = 100;

/// Query keys never treated as column filters.
pub const PAGINATION_KEYS: &[&str] = &["page", "limit", "sort", "order"];

pub type Transform = fn(Fields) -> Result<Fields, AppError>;
pub type BuildFilter = fn(&HashMap<String, String>) -> Result<Filter, AppError>;

/// Per-resource extension points.
#[derive(Clone, Copy)]
pub struct ResourceHooks {
    pub transform_create: Transform,
    pub transform_update: Transform,
    pub build_filter: BuildFilter,
}

impl ResourceHooks {
    /// Identity transforms and flat equality filtering.
    pub fn defaults<T: Resource>() -> Self {
        ResourceHooks {
            transform_create: identity,
            transform_update: identity,
            build_filter: equality_filter::<T>,
        }
    }
}

pub fn identity(fields: Fields) -> Result<Fields, AppError> {
    Ok(fields)
}

/// One equality condition per query parameter naming a known column.
/// Pagination keys, empty values, and unknown names are skipped.
pub fn equality_filter<T: Resource>(params: &HashMap<String, String>) -> Result<Filter, AppError> {
    let sorted: BTreeMap<&String, &String> = params.iter().collect();
    let mut filter = Filter::new();
    for (key, raw) in sorted {
        if PAGINATION_KEYS.contains(&key.as_str()) || raw.is_empty() {
            continue;
        }
        let Some(column) = T::column(&to_snake_case(key)) else { continue };
        filter = filter.eq(column.name, coerce(column, key, raw)?);
    }
    Ok(filter)
}

fn coerce(column: &Column, key: &str, raw: &str) -> Result<Value, AppError> {
    match column.kind {
        ColumnKind::BigInt => raw.trim().parse::<i64>().map(Value::from).map_err(|_| {
            AppError::InvalidRequest(vec![FieldError::new(
                key,
                format!("{} must be a number", key),
                Some(Value::String(raw.to_string())),
            )])
        }),
        ColumnKind::Text | ColumnKind::Timestamp => Ok(Value::String(raw.to_string())),
    }
}

/// Map a camelCase JSON object onto writable columns. Only the exact camelCase
/// name of a column is accepted; unknown, snake_case, and store-assigned keys
/// are dropped.
pub fn fields_from_body<T: Resource>(body: Value) -> Result<Fields, AppError> {
    let Value::Object(map) = body else {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| {
            let column = T::COLUMNS
                .iter()
                .find(|c| c.is_writable() && to_camel_case(c.name) == k)?;
            Some((column.name.to_string(), v))
        })
        .collect())
}

pub fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Offset/limit from `page` and `limit`, applied only when both parse as positive integers.
pub fn list_options(params: &HashMap<String, String>) -> QueryOptions {
    let page = params.get("page").and_then(|p| p.trim().parse::<u64>().ok());
    let limit = params.get("limit").and_then(|l| l.trim().parse::<u64>().ok());
    match (page, limit) {
        (Some(page), Some(limit)) if page > 0 && limit > 0 => QueryOptions::new()
            .offset((page - 1).saturating_mul(limit))
            .limit(limit),
        _ => QueryOptions::new(),
    }
}

pub fn render<D: Serialize>(
    result: Result<D, AppError>,
    status: StatusCode,
    ok_message: &str,
    failure_message: &str,
    expose_errors: bool,
) -> Response {
    match result {
        Ok(data) => success(status, data, ok_message),
        Err(e) => e.into_envelope(failure_message, expose_errors),
    }
}

async fn list_records<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    params: &HashMap<String, String>,
) -> Result<Vec<T>, AppError> {
    let filter = (hooks.build_filter)(params)?;
    repo.find_many(&filter, &list_options(params)).await
}

pub async fn get_all<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    params: &HashMap<String, String>,
    expose_errors: bool,
) -> Response {
    render(
        list_records(repo, hooks, params).await,
        StatusCode::OK,
        "Records retrieved successfully",
        "Failed to retrieve records",
        expose_errors,
    )
}

pub async fn get_by_id<T: Resource>(repo: &dyn Repository<T>, id: i64, expose_errors: bool) -> Response {
    let result = match repo.find_by_id(id).await {
        Ok(Some(row)) => Ok(row),
        Ok(None) => Err(AppError::NotFound("Record not found".into())),
        Err(e) => Err(e),
    };
    render(
        result,
        StatusCode::OK,
        "Record retrieved successfully",
        "Failed to retrieve record",
        expose_errors,
    )
}

async fn create_record<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    body: Value,
) -> Result<T, AppError> {
    let fields = (hooks.transform_create)(fields_from_body::<T>(body)?)?;
    repo.create(&fields).await
}

pub async fn create<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    body: Value,
    expose_errors: bool,
) -> Response {
    render(
        create_record(repo, hooks, body).await,
        StatusCode::CREATED,
        "Record created successfully",
        "Failed to create record",
        expose_errors,
    )
}

async fn update_record<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    id: i64,
    body: Value,
) -> Result<T, AppError> {
    let fields = (hooks.transform_update)(fields_from_body::<T>(body)?)?;
    if repo.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Record not found".into()));
    }
    repo.update(id, &fields).await
}

pub async fn update<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    id: i64,
    body: Value,
    expose_errors: bool,
) -> Response {
    render(
        update_record(repo, hooks, id, body).await,
        StatusCode::OK,
        "Record updated successfully",
        "Failed to update record",
        expose_errors,
    )
}

async fn delete_record<T: Resource>(repo: &dyn Repository<T>, id: i64) -> Result<T, AppError> {
    if repo.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Record not found".into()));
    }
    repo.delete(id).await
}

pub async fn delete<T: Resource>(repo: &dyn Repository<T>, id: i64, expose_errors: bool) -> Response {
    render(
        delete_record(repo, id).await,
        StatusCode::OK,
        "Record deleted successfully",
        "Failed to delete record",
        expose_errors,
    )
}

async fn count_records<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    params: &HashMap<String, String>,
) -> Result<MetaCount, AppError> {
    let filter = (hooks.build_filter)(params)?;
    Ok(MetaCount {
        count: repo.count(&filter).await?,
    })
}

pub async fn count<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    params: &HashMap<String, String>,
    expose_errors: bool,
) -> Response {
    render(
        count_records(repo, hooks, params).await,
        StatusCode::OK,
        "Count retrieved successfully",
        "Failed to get count",
        expose_errors,
    )
}

/// Default for resources without a domain search.
pub fn search_not_implemented() -> Response {
    AppError::NotImplemented("Search not implemented for this resource".into())
        .into_envelope("Search not implemented for this resource", false)
}

/// Accepts a JSON array, or an object whose `data` field is an array.
fn bulk_items(body: Value) -> Result<Vec<Value>, AppError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AppError::BadRequest("Data must be an array".into())),
        },
        _ => Err(AppError::BadRequest("Data must be an array".into())),
    }
}

async fn bulk_create_records<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    body: Value,
) -> Result<MetaCount, AppError> {
    let items = bulk_items(body)?;
    if items.len() > BULK_LIMIT {
        return Err(AppError::BadRequest(format!(
            "bulk create limited to {} items",
            BULK_LIMIT
        )));
    }
    let rows = items
        .into_iter()
        .map(|item| (hooks.transform_create)(fields_from_body::<T>(item)?))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MetaCount {
        count: repo.create_many(&rows).await?,
    })
}

pub async fn bulk_create<T: Resource>(
    repo: &dyn Repository<T>,
    hooks: &ResourceHooks,
    body: Value,
    expose_errors: bool,
) -> Response {
    render(
        bulk_create_records(repo, hooks, body).await,
        StatusCode::CREATED,
        "Records created successfully",
        "Failed to create records",
        expose_errors,
    )
}
