//! Shared application state for all routes.

use crate::model::Student;
use crate::service::{MemoryRepository, PgRepository, StudentService};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub students: StudentService,
    /// Present when backed by PostgreSQL; closed by the owner at shutdown.
    pub pool: Option<PgPool>,
    /// Send underlying error text with 500 responses (development only).
    pub expose_errors: bool,
}

impl AppState {
    pub fn postgres(pool: PgPool, expose_errors: bool) -> Self {
        AppState {
            students: StudentService::new(Arc::new(PgRepository::<Student>::new(pool.clone()))),
            pool: Some(pool),
            expose_errors,
        }
    }

    pub fn in_memory(expose_errors: bool) -> Self {
        AppState {
            students: StudentService::new(Arc::new(MemoryRepository::<Student>::new())),
            pool: None,
            expose_errors,
        }
    }
}
