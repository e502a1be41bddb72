//! Configuration values the server is started with.

use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Development responses carry underlying error text.
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Backing store for the student repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Postgres,
    /// Process-local; data is lost at exit.
    Memory,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub environment: Environment,
    pub storage: StorageKind,
    /// Built single-page app, served for any path the API does not match.
    pub static_dir: Option<PathBuf>,
    pub body_limit_bytes: usize,
    /// Allowed origin; any origin when unset.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            database_url: "postgres://localhost/students".into(),
            host: "0.0.0.0".into(),
            port: 3000,
            max_connections: 5,
            environment: Environment::default(),
            storage: StorageKind::default(),
            static_dir: None,
            body_limit_bytes: 1024 * 1024,
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
