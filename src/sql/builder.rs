//! Builds parameterized INSERT, SELECT, UPDATE, DELETE for a resource.
//! Identifiers come only from the resource's declared columns; values are always parameters.

use crate::resource::{ColumnKind, ColumnRole, Resource};
use crate::sql::{Condition, Fields, Filter, QueryOptions};
use serde_json::Value;

/// Quote identifier for PostgreSQL.
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Escape LIKE metacharacters so the term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn column_list<T: Resource>() -> String {
    T::COLUMNS
        .iter()
        .map(|c| quoted(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$n`, with a cast for timestamp columns so string values bind correctly.
fn placeholder(kind: ColumnKind, n: usize) -> String {
    match kind {
        ColumnKind::Timestamp => format!("${}::timestamptz", n),
        _ => format!("${}", n),
    }
}

/// Appends ` WHERE ...` for conditions on known columns. Unknown columns are skipped.
fn push_where<T: Resource>(q: &mut QueryBuf, filter: &Filter) {
    let mut parts = Vec::new();
    for cond in &filter.conditions {
        match cond {
            Condition::Eq { column, value } | Condition::NotEq { column, value } => {
                let Some(col) = T::column(column) else { continue };
                let op = if matches!(cond, Condition::Eq { .. }) { "=" } else { "<>" };
                let n = q.push_param(value.clone());
                parts.push(format!("{} {} {}", quoted(col.name), op, placeholder(col.kind, n)));
            }
            Condition::ContainsAny { columns, term } => {
                let cols: Vec<_> = columns.iter().filter_map(|c| T::column(c)).collect();
                if cols.is_empty() {
                    continue;
                }
                let n = q.push_param(Value::String(format!("%{}%", escape_like(term))));
                let ors: Vec<String> = cols
                    .iter()
                    .map(|c| format!("{} ILIKE ${}", quoted(c.name), n))
                    .collect();
                parts.push(format!("({})", ors.join(" OR ")));
            }
        }
    }
    if !parts.is_empty() {
        q.sql.push_str(" WHERE ");
        q.sql.push_str(&parts.join(" AND "));
    }
}

fn push_order_and_page<T: Resource>(q: &mut QueryBuf, options: &QueryOptions) {
    let mut order: Vec<String> = options
        .order_by
        .iter()
        .filter_map(|(c, o)| T::column(c).map(|col| format!("{} {}", quoted(col.name), o.keyword())))
        .collect();
    if order.is_empty() {
        order.push(quoted(T::PRIMARY_KEY));
    }
    q.sql.push_str(" ORDER BY ");
    q.sql.push_str(&order.join(", "));
    if let Some(limit) = options.limit {
        q.sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = options.offset {
        q.sql.push_str(&format!(" OFFSET {}", offset));
    }
}

/// SELECT with filter, ORDER BY (primary key when unspecified), optional LIMIT/OFFSET.
pub fn select<T: Resource>(filter: &Filter, options: &QueryOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT {} FROM {}", column_list::<T>(), quoted(T::TABLE));
    push_where::<T>(&mut q, filter);
    push_order_and_page::<T>(&mut q, options);
    q
}

/// SELECT ... FOR UPDATE of the first matching row. Used inside upsert transactions.
pub fn select_first_for_update<T: Resource>(filter: &Filter) -> QueryBuf {
    let mut q = select::<T>(filter, &QueryOptions::new().limit(1));
    q.sql.push_str(" FOR UPDATE");
    q
}

pub fn select_by_id<T: Resource>(id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        column_list::<T>(),
        quoted(T::TABLE),
        quoted(T::PRIMARY_KEY),
        n
    );
    q
}

pub fn count<T: Resource>(filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", quoted(T::TABLE));
    push_where::<T>(&mut q, filter);
    q
}

/// INSERT of writable columns present in `fields`; store-assigned columns take their defaults.
pub fn insert<T: Resource>(fields: &Fields) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in T::COLUMNS.iter().filter(|c| c.is_writable()) {
        let Some(val) = fields.get(c.name) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(c.name));
        placeholders.push(placeholder(c.kind, n));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(T::TABLE),
            column_list::<T>()
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(T::TABLE),
            cols.join(", "),
            placeholders.join(", "),
            column_list::<T>()
        )
    };
    q
}

fn push_set_clause<T: Resource>(q: &mut QueryBuf, fields: &Fields) {
    let mut sets = Vec::new();
    for c in T::COLUMNS {
        match c.role {
            ColumnRole::Data => {
                let Some(val) = fields.get(c.name) else { continue };
                let n = q.push_param(val.clone());
                sets.push(format!("{} = {}", quoted(c.name), placeholder(c.kind, n)));
            }
            ColumnRole::UpdatedAt => sets.push(format!("{} = NOW()", quoted(c.name))),
            ColumnRole::PrimaryKey | ColumnRole::CreatedAt => {}
        }
    }
    if sets.is_empty() {
        // Keeps the statement valid when nothing is writable; a no-op assignment.
        sets.push(format!("{0} = {0}", quoted(T::PRIMARY_KEY)));
    }
    q.sql.push_str(" SET ");
    q.sql.push_str(&sets.join(", "));
}

/// UPDATE by primary key: SET only writable columns present in `fields`, refresh update timestamps.
pub fn update_by_id<T: Resource>(id: i64, fields: &Fields) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("UPDATE {}", quoted(T::TABLE));
    push_set_clause::<T>(&mut q, fields);
    let n = q.push_param(Value::from(id));
    q.sql.push_str(&format!(
        " WHERE {} = ${} RETURNING {}",
        quoted(T::PRIMARY_KEY),
        n,
        column_list::<T>()
    ));
    q
}

pub fn update_where<T: Resource>(filter: &Filter, fields: &Fields) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("UPDATE {}", quoted(T::TABLE));
    push_set_clause::<T>(&mut q, fields);
    push_where::<T>(&mut q, filter);
    q
}

pub fn delete_by_id<T: Resource>(id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${} RETURNING {}",
        quoted(T::TABLE),
        quoted(T::PRIMARY_KEY),
        n,
        column_list::<T>()
    );
    q
}

pub fn delete_where<T: Resource>(filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", quoted(T::TABLE));
    push_where::<T>(&mut q, filter);
    q
}
