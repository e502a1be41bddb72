//! Record shapes the generic repository can persist.
//!
//! A resource declares its table, columns, and unique keys; column names are
//! snake_case and the serde representation of the record uses the camelCase
//! form of the same names.

use crate::case::to_camel_case;
use crate::error::AppError;
use crate::sql::Fields;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    BigInt,
    Text,
    Timestamp,
}

impl ColumnKind {
    pub fn pg_type(self) -> &'static str {
        match self {
            ColumnKind::BigInt => "BIGINT",
            ColumnKind::Text => "TEXT",
            ColumnKind::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// Who assigns a column's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnRole {
    /// Written from request data.
    Data,
    /// Store-assigned identity.
    PrimaryKey,
    /// Set once on insert.
    CreatedAt,
    /// Set on insert and refreshed on every update.
    UpdatedAt,
}

#[derive(Clone, Copy, Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub role: ColumnRole,
    pub nullable: bool,
}

impl Column {
    pub const fn data(name: &'static str, kind: ColumnKind, nullable: bool) -> Self {
        Column {
            name,
            kind,
            role: ColumnRole::Data,
            nullable,
        }
    }

    pub const fn generated(name: &'static str, kind: ColumnKind, role: ColumnRole) -> Self {
        Column {
            name,
            kind,
            role,
            nullable: false,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.role == ColumnRole::Data
    }
}

/// A single-column unique constraint and the message reported when it is violated.
#[derive(Clone, Copy, Debug)]
pub struct UniqueKey {
    pub constraint: &'static str,
    pub column: &'static str,
    pub message: &'static str,
}

pub trait Resource:
    Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + for<'r> sqlx::FromRow<'r, PgRow> + 'static
{
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];
    const PRIMARY_KEY: &'static str = "id";
    const UNIQUE_KEYS: &'static [UniqueKey] = &[];

    fn id(&self) -> i64;

    fn column(name: &str) -> Option<&'static Column> {
        Self::COLUMNS.iter().find(|c| c.name == name)
    }

    fn unique_key_for_constraint(constraint: &str) -> Option<&'static UniqueKey> {
        Self::UNIQUE_KEYS.iter().find(|k| k.constraint == constraint)
    }

    /// Build a record from a full column map.
    fn from_fields(fields: &Fields) -> Result<Self, AppError> {
        let object: serde_json::Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (to_camel_case(k), v.clone()))
            .collect();
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}
