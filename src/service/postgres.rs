//! Generic CRUD execution against PostgreSQL.

use crate::error::AppError;
use crate::resource::Resource;
use crate::service::Repository;
use crate::sql::{self, Fields, Filter, PgBindValue, QueryBuf, QueryOptions};
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use std::marker::PhantomData;

/// Repository for `T` backed by a shared pool. Cloning shares the pool.
pub struct PgRepository<T> {
    pool: PgPool,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for PgRepository<T> {
    fn clone(&self) -> Self {
        PgRepository {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Resource> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        PgRepository {
            pool,
            _record: PhantomData,
        }
    }
}

/// Map a unique violation on a declared key to `Duplicate`; pass everything else through.
fn store_error<T: Resource>(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            if let Some(key) = db.constraint().and_then(T::unique_key_for_constraint) {
                tracing::warn!(constraint = key.constraint, "unique key violated at the store");
                return AppError::Duplicate(key.message.to_string());
            }
        }
    }
    AppError::Db(e)
}

async fn fetch_all<'e, T, E>(executor: E, q: &QueryBuf) -> Result<Vec<T>, AppError>
where
    T: Resource,
    E: PgExecutor<'e>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    query.fetch_all(executor).await.map_err(store_error::<T>)
}

async fn fetch_optional<'e, T, E>(executor: E, q: &QueryBuf) -> Result<Option<T>, AppError>
where
    T: Resource,
    E: PgExecutor<'e>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    query.fetch_optional(executor).await.map_err(store_error::<T>)
}

async fn fetch_one<'e, T, E>(executor: E, q: &QueryBuf) -> Result<T, AppError>
where
    T: Resource,
    E: PgExecutor<'e>,
{
    fetch_optional(executor, q)
        .await?
        .ok_or(AppError::Db(sqlx::Error::RowNotFound))
}

async fn execute<'e, T, E>(executor: E, q: &QueryBuf) -> Result<u64, AppError>
where
    T: Resource,
    E: PgExecutor<'e>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    let result = query.execute(executor).await.map_err(store_error::<T>)?;
    Ok(result.rows_affected())
}

#[async_trait]
impl<T: Resource> Repository<T> for PgRepository<T> {
    async fn find_by_id(&self, id: i64) -> Result<Option<T>, AppError> {
        fetch_optional(&self.pool, &sql::select_by_id::<T>(id)).await
    }

    async fn find_many(&self, filter: &Filter, options: &QueryOptions) -> Result<Vec<T>, AppError> {
        fetch_all(&self.pool, &sql::select::<T>(filter, options)).await
    }

    async fn create(&self, fields: &Fields) -> Result<T, AppError> {
        fetch_one(&self.pool, &sql::insert::<T>(fields)).await
    }

    async fn update(&self, id: i64, fields: &Fields) -> Result<T, AppError> {
        fetch_one(&self.pool, &sql::update_by_id::<T>(id, fields)).await
    }

    async fn update_many(&self, filter: &Filter, fields: &Fields) -> Result<u64, AppError> {
        execute::<T, _>(&self.pool, &sql::update_where::<T>(filter, fields)).await
    }

    async fn delete(&self, id: i64) -> Result<T, AppError> {
        fetch_one(&self.pool, &sql::delete_by_id::<T>(id)).await
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        execute::<T, _>(&self.pool, &sql::delete_where::<T>(filter)).await
    }

    async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        let q = sql::count::<T>(filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn create_many(&self, rows: &[Fields]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut count = 0u64;
        for fields in rows {
            count += execute::<T, _>(&mut *tx, &sql::insert::<T>(fields)).await?;
        }
        tx.commit().await?;
        Ok(count)
    }

    async fn upsert(&self, filter: &Filter, update: &Fields, create: &Fields) -> Result<T, AppError> {
        let mut tx = self.pool.begin().await?;
        let existing: Option<T> = fetch_optional(&mut *tx, &sql::select_first_for_update::<T>(filter)).await?;
        let row = match existing {
            Some(current) => fetch_one(&mut *tx, &sql::update_by_id::<T>(current.id(), update)).await?,
            None => fetch_one(&mut *tx, &sql::insert::<T>(create)).await?,
        };
        tx.commit().await?;
        Ok(row)
    }
}
