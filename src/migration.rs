//! Schema DDL derived from resource declarations, applied idempotently at startup.

use crate::error::AppError;
use crate::model::Student;
use crate::resource::{ColumnKind, ColumnRole, Resource};
use crate::sql::quoted;
use sqlx::PgPool;

/// CREATE TABLE IF NOT EXISTS for `T`, with a named UNIQUE constraint per unique key.
pub fn create_table_ddl<T: Resource>() -> String {
    let mut defs: Vec<String> = T::COLUMNS
        .iter()
        .map(|c| {
            let name = quoted(c.name);
            match c.role {
                ColumnRole::PrimaryKey if c.kind == ColumnKind::BigInt => format!("{} BIGSERIAL PRIMARY KEY", name),
                ColumnRole::PrimaryKey => format!("{} {} PRIMARY KEY", name, c.kind.pg_type()),
                ColumnRole::CreatedAt | ColumnRole::UpdatedAt => {
                    format!("{} {} NOT NULL DEFAULT NOW()", name, c.kind.pg_type())
                }
                ColumnRole::Data if c.nullable => format!("{} {}", name, c.kind.pg_type()),
                ColumnRole::Data => format!("{} {} NOT NULL", name, c.kind.pg_type()),
            }
        })
        .collect();
    defs.extend(
        T::UNIQUE_KEYS
            .iter()
            .map(|k| format!("CONSTRAINT {} UNIQUE ({})", quoted(k.constraint), quoted(k.column))),
    );
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quoted(T::TABLE),
        defs.join(",\n    ")
    )
}

pub fn create_index_ddl<T: Resource>(name: &str, columns: &[&str]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quoted(c)).collect();
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        quoted(name),
        quoted(T::TABLE),
        cols.join(", ")
    )
}

/// Statements run at startup, in order.
pub fn migrations() -> Vec<String> {
    vec![
        create_table_ddl::<Student>(),
        create_index_ddl::<Student>("students_name_idx", &["first_name", "last_name"]),
    ]
}

pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    for ddl in migrations() {
        tracing::debug!(sql = %ddl, "migration");
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!("migrations applied");
    Ok(())
}
