//! Generic repository contract over a resource type.

use crate::error::AppError;
use crate::resource::Resource;
use crate::sql::{Fields, Filter, QueryOptions};
use async_trait::async_trait;

/// Uniform CRUD over one table. Every store failure propagates to the caller;
/// no retries or extra batching are added on top of the store.
#[async_trait]
pub trait Repository<T: Resource>: Send + Sync {
    async fn find_all(&self, options: &QueryOptions) -> Result<Vec<T>, AppError> {
        self.find_many(&Filter::new(), options).await
    }

    /// `Ok(None)` for a missing row.
    async fn find_by_id(&self, id: i64) -> Result<Option<T>, AppError>;

    async fn find_many(&self, filter: &Filter, options: &QueryOptions) -> Result<Vec<T>, AppError>;

    async fn find_first(&self, filter: &Filter, options: &QueryOptions) -> Result<Option<T>, AppError> {
        let mut opts = options.clone();
        opts.limit = Some(1);
        Ok(self.find_many(filter, &opts).await?.into_iter().next())
    }

    /// Insert one row. Violated unique keys surface as `AppError::Duplicate`.
    async fn create(&self, fields: &Fields) -> Result<T, AppError>;

    /// Fails with `sqlx::Error::RowNotFound` when `id` does not exist.
    async fn update(&self, id: i64, fields: &Fields) -> Result<T, AppError>;

    /// Returns the number of rows affected.
    async fn update_many(&self, filter: &Filter, fields: &Fields) -> Result<u64, AppError>;

    /// Returns the deleted row's prior state; `RowNotFound` when absent.
    async fn delete(&self, id: i64) -> Result<T, AppError>;

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError>;

    async fn count(&self, filter: &Filter) -> Result<u64, AppError>;

    async fn exists(&self, filter: &Filter) -> Result<bool, AppError> {
        Ok(self.count(filter).await? > 0)
    }

    /// Insert all rows in one transaction; returns the inserted count.
    async fn create_many(&self, rows: &[Fields]) -> Result<u64, AppError>;

    /// Update the first row matching `filter` with `update`, or insert `create`.
    async fn upsert(&self, filter: &Filter, update: &Fields, create: &Fields) -> Result<T, AppError>;
}
