//! Store-neutral query description: filters, ordering, and column maps.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Column name -> value. Ordered so generated SQL is stable.
pub type Fields = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
    NotEq { column: String, value: Value },
    /// Case-insensitive substring match on any of the columns.
    ContainsAny { columns: Vec<String>, term: String },
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn not_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::NotEq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains_any(mut self, columns: &[&str], term: impl Into<String>) -> Self {
        self.conditions.push(Condition::ContainsAny {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.into(),
        });
        self
    }

    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    /// Evaluate against an in-memory row.
    pub fn matches(&self, row: &Fields) -> bool {
        self.conditions.iter().all(|c| match c {
            Condition::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
            Condition::NotEq { column, value } => row.get(column).unwrap_or(&Value::Null) != value,
            Condition::ContainsAny { columns, term } => {
                let needle = term.to_lowercase();
                columns.iter().any(|col| {
                    row.get(col)
                        .and_then(Value::as_str)
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// "desc" (any case) is descending; everything else ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    pub order_by: Vec<(String, SortOrder)>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compare two in-memory rows by `order_by`, falling back to `tiebreak`.
    pub fn compare(&self, a: &Fields, b: &Fields, tiebreak: &str) -> Ordering {
        for (column, order) in &self.order_by {
            let ord = compare_values(a.get(column), b.get(column));
            let ord = match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        compare_values(a.get(tiebreak), b.get(tiebreak))
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // NULLS LAST, as PostgreSQL does for ascending order.
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
