//! Student records: REST backend over PostgreSQL with a typed client.

pub mod case;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use client::{ClientError, NewStudent, PageQuery, StudentClient, StudentPatch};
pub use config::{Environment, ServerConfig, StorageKind};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use model::Student;
pub use routes::app;
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
