//! Student routes: the generic handlers with student hooks, plus uniqueness,
//! lookup by code, search, and pagination.

use crate::case::to_camel_case;
use crate::error::AppError;
use crate::handlers::resource::{self, fields_from_body, json_body, render, ResourceHooks};
use crate::model::Student;
use crate::service::{parse_id, search_filter, FieldRule, Format, PageRequest, RequestValidator};
use crate::sql::{Fields, Filter};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const ID_MESSAGE: &str = "Student ID must be a number";

/// Columns that must hold non-blank text.
const REQUIRED: [&str; 4] = ["student_code", "first_name", "last_name", "email"];

const fn text(
    field: &'static str,
    required: bool,
    required_message: &'static str,
    type_message: &'static str,
) -> FieldRule {
    FieldRule {
        field,
        required,
        nullable: false,
        format: Format::Text,
        required_message,
        type_message,
        format_message: "",
    }
}

const fn email(required: bool) -> FieldRule {
    FieldRule {
        field: "email",
        required,
        nullable: false,
        format: Format::Email,
        required_message: "Email is required",
        type_message: "Email must be a string",
        format_message: "Must be a valid email address",
    }
}

const PHONE: FieldRule = FieldRule {
    field: "phone",
    required: false,
    nullable: true,
    format: Format::Text,
    required_message: "",
    type_message: "Phone must be a string",
    format_message: "",
};

pub const CREATE_RULES: &[FieldRule] = &[
    text("studentCode", true, "Student's code is required", "Student code must be a string"),
    text("firstName", true, "Student's first name is required", "First name must be a string"),
    text("lastName", true, "Student's last name is required", "Last name must be a string"),
    email(true),
    PHONE,
];

pub const UPDATE_RULES: &[FieldRule] = &[
    text("studentCode", false, "Student's code is required", "Student code must be a string"),
    text("firstName", false, "Student's first name is required", "First name must be a string"),
    text("lastName", false, "Student's last name is required", "Last name must be a string"),
    email(false),
    PHONE,
];

pub const HOOKS: ResourceHooks = ResourceHooks {
    transform_create: normalize_create,
    transform_update: normalize_update,
    build_filter: student_filter,
};

/// Trim text, lowercase email, and turn a blank phone into null.
fn normalize(mut fields: Fields) -> Fields {
    for (column, value) in fields.iter_mut() {
        let Value::String(s) = value else { continue };
        let trimmed = s.trim();
        *value = match column.as_str() {
            "email" => Value::String(trimmed.to_lowercase()),
            "phone" if trimmed.is_empty() => Value::Null,
            _ => Value::String(trimmed.to_string()),
        };
    }
    fields
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn validation_failed(problems: Vec<String>) -> Result<Fields, AppError> {
    Err(AppError::Validation(format!("Validation failed: {}", problems.join(", "))))
}

pub fn normalize_create(fields: Fields) -> Result<Fields, AppError> {
    let fields = normalize(fields);
    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|c| is_blank(fields.get(**c)))
        .map(|c| format!("{} is required", to_camel_case(c)))
        .collect();
    if missing.is_empty() {
        Ok(fields)
    } else {
        validation_failed(missing)
    }
}

/// Only fields present are touched; a required field sent blank is rejected.
pub fn normalize_update(fields: Fields) -> Result<Fields, AppError> {
    let fields = normalize(fields);
    let blank: Vec<String> = REQUIRED
        .iter()
        .filter(|c| fields.contains_key(**c) && is_blank(fields.get(**c)))
        .map(|c| format!("{} cannot be empty", to_camel_case(c)))
        .collect();
    if blank.is_empty() {
        Ok(fields)
    } else {
        validation_failed(blank)
    }
}

/// `search` becomes an OR-substring match; everything else is equality.
pub fn student_filter(params: &HashMap<String, String>) -> Result<Filter, AppError> {
    let mut rest = params.clone();
    let search = rest
        .remove("search")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let filter = resource::equality_filter::<Student>(&rest)?;
    Ok(match search {
        Some(term) => search_filter(&term).and(filter),
        None => filter,
    })
}

pub async fn list(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    resource::get_all(state.students.repository(), &HOOKS, &params, state.expose_errors).await
}

pub async fn count(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    resource::count(state.students.repository(), &HOOKS, &params, state.expose_errors).await
}

pub async fn get_by_id(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    match parse_id(&raw_id, ID_MESSAGE) {
        Ok(id) => resource::get_by_id(state.students.repository(), id, state.expose_errors).await,
        Err(e) => e.into_envelope("Failed to retrieve record", state.expose_errors),
    }
}

pub async fn delete(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    match parse_id(&raw_id, ID_MESSAGE) {
        Ok(id) => resource::delete(state.students.repository(), id, state.expose_errors).await,
        Err(e) => e.into_envelope("Failed to delete record", state.expose_errors),
    }
}

pub async fn bulk(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    match json_body(body) {
        Ok(body) => resource::bulk_create(state.students.repository(), &HOOKS, body, state.expose_errors).await,
        Err(e) => e.into_envelope("Failed to create records", state.expose_errors),
    }
}

async fn create_student(state: &AppState, body: Result<Json<Value>, JsonRejection>) -> Result<Student, AppError> {
    let body = json_body(body)?;
    RequestValidator::validate(&body, CREATE_RULES)?;
    let fields = (HOOKS.transform_create)(fields_from_body::<Student>(body)?)?;
    state.students.ensure_unique(&fields, None).await?;
    state.students.repository().create(&fields).await
}

pub async fn create(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    render(
        create_student(&state, body).await,
        StatusCode::CREATED,
        "Student created successfully",
        "Failed to create student",
        state.expose_errors,
    )
}

async fn update_student(
    state: &AppState,
    raw_id: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Student, AppError> {
    let id = parse_id(raw_id, ID_MESSAGE)?;
    let body = json_body(body)?;
    RequestValidator::validate(&body, UPDATE_RULES)?;
    let fields = (HOOKS.transform_update)(fields_from_body::<Student>(body)?)?;
    let repo = state.students.repository();
    if repo.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Student not found".into()));
    }
    state.students.ensure_unique(&fields, Some(id)).await?;
    repo.update(id, &fields).await
}

pub async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    render(
        update_student(&state, &raw_id, body).await,
        StatusCode::OK,
        "Student updated successfully",
        "Failed to update student",
        state.expose_errors,
    )
}

async fn search_students(state: &AppState, params: &HashMap<String, String>) -> Result<Vec<Student>, AppError> {
    let term = params.get("q").map(|q| q.trim()).filter(|q| !q.is_empty());
    let Some(term) = term else {
        return Err(AppError::BadRequest("Search term is required".into()));
    };
    state.students.search(term).await
}

pub async fn search(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    render(
        search_students(&state, &params).await,
        StatusCode::OK,
        "Search results retrieved successfully",
        "Failed to search students",
        state.expose_errors,
    )
}

pub async fn paginated(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let req = PageRequest::from_query(&params);
    render(
        state.students.get_paginated(&req).await,
        StatusCode::OK,
        "Paginated students retrieved successfully",
        "Failed to retrieve paginated students",
        state.expose_errors,
    )
}

async fn student_by_code(state: &AppState, code: &str) -> Result<Student, AppError> {
    state
        .students
        .find_by_code(code)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".into()))
}

pub async fn get_by_code(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    render(
        student_by_code(&state, &code).await,
        StatusCode::OK,
        "Student retrieved successfully",
        "Failed to retrieve student",
        state.expose_errors,
    )
}
