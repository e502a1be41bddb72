//! Student record.

use crate::resource::{Column, ColumnKind, ColumnRole, Resource, UniqueKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const STUDENT_CODE_TAKEN: &str = "Student code already exists";
pub const EMAIL_TAKEN: &str = "Email already exists";

/// Columns searched by free-text queries.
pub const SEARCH_COLUMNS: &[&str] = &["first_name", "last_name", "student_code", "email"];

impl Resource for Student {
    const TABLE: &'static str = "students";
    const COLUMNS: &'static [Column] = &[
        Column::generated("id", ColumnKind::BigInt, ColumnRole::PrimaryKey),
        Column::data("student_code", ColumnKind::Text, false),
        Column::data("first_name", ColumnKind::Text, false),
        Column::data("last_name", ColumnKind::Text, false),
        Column::data("email", ColumnKind::Text, false),
        Column::data("phone", ColumnKind::Text, true),
        Column::generated("created_at", ColumnKind::Timestamp, ColumnRole::CreatedAt),
        Column::generated("updated_at", ColumnKind::Timestamp, ColumnRole::UpdatedAt),
    ];
    const UNIQUE_KEYS: &'static [UniqueKey] = &[
        UniqueKey {
            constraint: "students_student_code_key",
            column: "student_code",
            message: STUDENT_CODE_TAKEN,
        },
        UniqueKey {
            constraint: "students_email_key",
            column: "email",
            message: EMAIL_TAKEN,
        },
    ];

    fn id(&self) -> i64 {
        self.id
    }
}
