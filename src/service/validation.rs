//! Request validation from declarative field rules.

use crate::error::{AppError, FieldError};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Email,
}

/// Rule for one body field. Messages are what clients see.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    /// Optional fields may also be sent as `null`.
    pub nullable: bool,
    pub format: Format,
    pub required_message: &'static str,
    pub type_message: &'static str,
    pub format_message: &'static str,
}

pub struct RequestValidator;

impl RequestValidator {
    /// Check every rule and collect all failures; the first failing check per field is reported.
    pub fn validate(body: &Value, rules: &[FieldRule]) -> Result<(), AppError> {
        let Value::Object(map) = body else {
            return Err(AppError::BadRequest("body must be a JSON object".into()));
        };
        let mut errors = Vec::new();
        for rule in rules {
            let val = map.get(rule.field);
            if let Some(message) = check_field(val, rule) {
                errors.push(FieldError::new(rule.field, message, val.cloned()));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidRequest(errors))
        }
    }
}

fn check_field(val: Option<&Value>, rule: &FieldRule) -> Option<&'static str> {
    match val {
        None if rule.required => Some(rule.required_message),
        None => None,
        Some(Value::Null) if rule.required => Some(rule.required_message),
        Some(Value::Null) if rule.nullable => None,
        Some(Value::String(s)) if rule.required && s.is_empty() => Some(rule.required_message),
        Some(Value::String(s)) => match rule.format {
            Format::Email if !is_email(s) => Some(rule.format_message),
            _ => None,
        },
        Some(_) => Some(rule.type_message),
    }
}

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$";

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

pub fn is_email(s: &str) -> bool {
    email_regex().map(|re| re.is_match(s)).unwrap_or(false)
}

/// Parse a numeric path id; failures use the same shape as body validation.
pub fn parse_id(raw: &str, message: &str) -> Result<i64, AppError> {
    raw.trim().parse::<i64>().map_err(|_| {
        AppError::InvalidRequest(vec![FieldError::new(
            "id",
            message,
            Some(Value::String(raw.to_string())),
        )])
    })
}
