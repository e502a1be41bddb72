//! Build [`ServerConfig`] from environment variables.

use crate::config::types::{Environment, ServerConfig, StorageKind};
use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";
pub const DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
pub const APP_ENV: &str = "APP_ENV";
pub const STORAGE: &str = "STORAGE";
pub const STATIC_DIR: &str = "STATIC_DIR";
pub const BODY_LIMIT_BYTES: &str = "BODY_LIMIT_BYTES";
pub const CORS_ORIGIN: &str = "CORS_ORIGIN";

impl ServerConfig {
    /// Read from the process environment. Unset or empty variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`, so tests need not mutate process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = ServerConfig::default();
        if let Some(url) = get(DATABASE_URL) {
            config.database_url = url;
        }
        if let Some(host) = get(HOST) {
            config.host = host;
        }
        if let Some(port) = get(PORT) {
            config.port = parse(PORT, &port)?;
        }
        if let Some(n) = get(DB_MAX_CONNECTIONS) {
            config.max_connections = parse(DB_MAX_CONNECTIONS, &n)?;
        }
        if let Some(env) = get(APP_ENV) {
            config.environment = match env.to_ascii_lowercase().as_str() {
                "production" | "prod" => Environment::Production,
                "development" | "dev" => Environment::Development,
                _ => return Err(invalid(APP_ENV, env)),
            };
        }
        if let Some(storage) = get(STORAGE) {
            config.storage = match storage.to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => StorageKind::Postgres,
                "memory" => StorageKind::Memory,
                _ => return Err(invalid(STORAGE, storage)),
            };
        }
        config.static_dir = get(STATIC_DIR).map(PathBuf::from);
        if let Some(limit) = get(BODY_LIMIT_BYTES) {
            config.body_limit_bytes = parse(BODY_LIMIT_BYTES, &limit)?;
        }
        config.cors_origin = get(CORS_ORIGIN);
        Ok(config)
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { key, value }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value.to_string()))
}
