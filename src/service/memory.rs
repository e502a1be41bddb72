//! In-memory repository with the same contract as the PostgreSQL one.
//! Enforces the resource's unique keys, so duplicate handling behaves like the store.

use crate::error::AppError;
use crate::resource::{ColumnRole, Resource};
use crate::service::Repository;
use crate::sql::{Fields, Filter, QueryOptions};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Fields>,
}

pub struct MemoryRepository<T> {
    table: RwLock<Table>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Resource> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> MemoryRepository<T> {
    pub fn new() -> Self {
        MemoryRepository {
            table: RwLock::new(Table::default()),
            _record: PhantomData,
        }
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Reject `row` if another row (other than `except`) holds the same value on a unique key.
fn check_unique<T: Resource>(table: &Table, row: &Fields, except: Option<i64>) -> Result<(), AppError> {
    for key in T::UNIQUE_KEYS {
        let Some(value) = row.get(key.column).filter(|v| !v.is_null()) else { continue };
        let taken = table
            .rows
            .iter()
            .any(|(id, other)| Some(*id) != except && other.get(key.column) == Some(value));
        if taken {
            return Err(AppError::Duplicate(key.message.to_string()));
        }
    }
    Ok(())
}

fn apply_update<T: Resource>(row: &mut Fields, fields: &Fields) {
    for c in T::COLUMNS {
        match c.role {
            ColumnRole::Data => {
                if let Some(v) = fields.get(c.name) {
                    row.insert(c.name.to_string(), v.clone());
                }
            }
            ColumnRole::UpdatedAt => {
                row.insert(c.name.to_string(), now());
            }
            ColumnRole::PrimaryKey | ColumnRole::CreatedAt => {}
        }
    }
}

fn insert_row<T: Resource>(table: &mut Table, fields: &Fields) -> Result<T, AppError> {
    let id = table.next_id + 1;
    let mut row = Fields::new();
    for c in T::COLUMNS {
        let value = match c.role {
            ColumnRole::Data => fields.get(c.name).cloned().unwrap_or(Value::Null),
            ColumnRole::PrimaryKey => Value::from(id),
            ColumnRole::CreatedAt | ColumnRole::UpdatedAt => now(),
        };
        row.insert(c.name.to_string(), value);
    }
    check_unique::<T>(table, &row, None)?;
    let record = T::from_fields(&row)?;
    table.next_id = id;
    table.rows.insert(id, row);
    Ok(record)
}

fn select<'a>(table: &'a Table, filter: &Filter, options: &QueryOptions, pk: &str) -> Vec<&'a Fields> {
    let mut rows: Vec<&Fields> = table.rows.values().filter(|r| filter.matches(r)).collect();
    rows.sort_by(|a, b| options.compare(a, b, pk));
    let offset = usize::try_from(options.offset.unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = options
        .limit
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl<T: Resource> Repository<T> for MemoryRepository<T> {
    async fn find_by_id(&self, id: i64) -> Result<Option<T>, AppError> {
        let table = self.table.read().await;
        table.rows.get(&id).map(T::from_fields).transpose()
    }

    async fn find_many(&self, filter: &Filter, options: &QueryOptions) -> Result<Vec<T>, AppError> {
        let table = self.table.read().await;
        select(&table, filter, options, T::PRIMARY_KEY)
            .into_iter()
            .map(T::from_fields)
            .collect()
    }

    async fn create(&self, fields: &Fields) -> Result<T, AppError> {
        let mut table = self.table.write().await;
        insert_row(&mut table, fields)
    }

    async fn update(&self, id: i64, fields: &Fields) -> Result<T, AppError> {
        let mut table = self.table.write().await;
        let mut row = table
            .rows
            .get(&id)
            .cloned()
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        apply_update::<T>(&mut row, fields);
        check_unique::<T>(&table, &row, Some(id))?;
        let record = T::from_fields(&row)?;
        table.rows.insert(id, row);
        Ok(record)
    }

    async fn update_many(&self, filter: &Filter, fields: &Fields) -> Result<u64, AppError> {
        let mut table = self.table.write().await;
        let ids: Vec<i64> = table
            .rows
            .iter()
            .filter(|(_, r)| filter.matches(r))
            .map(|(id, _)| *id)
            .collect();
        // Each updated row is checked against the rows already rewritten.
        let mut staged = Table {
            next_id: table.next_id,
            rows: table.rows.clone(),
        };
        for id in &ids {
            let Some(mut row) = staged.rows.get(id).cloned() else { continue };
            apply_update::<T>(&mut row, fields);
            check_unique::<T>(&staged, &row, Some(*id))?;
            staged.rows.insert(*id, row);
        }
        *table = staged;
        Ok(ids.len() as u64)
    }

    async fn delete(&self, id: i64) -> Result<T, AppError> {
        let mut table = self.table.write().await;
        let row = table
            .rows
            .remove(&id)
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        T::from_fields(&row)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|_, r| !filter.matches(r));
        Ok((before - table.rows.len()) as u64)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn create_many(&self, rows: &[Fields]) -> Result<u64, AppError> {
        let mut table = self.table.write().await;
        // All-or-nothing, like the store's transaction.
        let mut staged = Table {
            next_id: table.next_id,
            rows: table.rows.clone(),
        };
        for fields in rows {
            insert_row::<T>(&mut staged, fields)?;
        }
        *table = staged;
        Ok(rows.len() as u64)
    }

    async fn upsert(&self, filter: &Filter, update: &Fields, create: &Fields) -> Result<T, AppError> {
        let mut table = self.table.write().await;
        let existing = select(&table, filter, &QueryOptions::new().limit(1), T::PRIMARY_KEY)
            .first()
            .and_then(|r| r.get(T::PRIMARY_KEY))
            .and_then(Value::as_i64);
        match existing {
            Some(id) => {
                let mut row = table.rows.get(&id).cloned().unwrap_or_default();
                apply_update::<T>(&mut row, update);
                check_unique::<T>(&table, &row, Some(id))?;
                let record = T::from_fields(&row)?;
                table.rows.insert(id, row);
                Ok(record)
            }
            None => insert_row(&mut table, create),
        }
    }
}
