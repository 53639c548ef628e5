//! Resolved runtime configuration.
//!
//! Settings-file values are defaults; environment variables win. Secrets
//! (API token, database URL) are wrapped in [`SecretString`] so they never
//! land in debug output or logs.

pub mod helpers;

use std::net::SocketAddr;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_bool_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Which storage implementation backs the client store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Central PostgreSQL, the production default.
    Postgres,
    /// In-process store for local development and tests.
    Memory,
}

impl StorageBackend {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "CAREDESK_DB_BACKEND".to_string(),
                message: format!("unsupported backend '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Bearer token required on `/client` routes. `None` disables the auth
    /// middleware (local development only; `serve` logs a warning).
    pub api_token: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<SecretString>,
    pub pool_size: usize,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

fn parse_listen_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: "CAREDESK_LISTEN".to_string(),
        message: format!("'{raw}' is not a valid socket address"),
    })
}

fn parse_pool_size(raw: &str) -> Result<usize, ConfigError> {
    let size: usize = raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: "CAREDESK_DB_POOL_SIZE".to_string(),
        message: format!("'{raw}' is not a number"),
    })?;
    if size == 0 {
        return Err(ConfigError::InvalidValue {
            key: "CAREDESK_DB_POOL_SIZE".to_string(),
            message: "pool size must be at least 1".to_string(),
        });
    }
    Ok(size)
}

fn secret_from(raw: Option<String>) -> Option<SecretString> {
    raw.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(SecretString::from(trimmed.to_string()))
        }
    })
}

impl AppConfig {
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let listen_raw = parse_string_env("CAREDESK_LISTEN", settings.server.listen.clone())?;
        let listen = parse_listen_addr(&listen_raw)?;

        let api_token = secret_from(
            optional_env("CAREDESK_API_TOKEN")?.or_else(|| settings.server.api_token.clone()),
        );

        let backend_raw =
            parse_string_env("CAREDESK_DB_BACKEND", settings.database.backend.clone())?;
        let backend = StorageBackend::from_str(&backend_raw)?;

        let url = secret_from(optional_env("DATABASE_URL")?.or_else(|| settings.database.url.clone()));
        if backend == StorageBackend::Postgres && url.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_URL".to_string(),
                message: "required when the storage backend is 'postgres'".to_string(),
            });
        }

        let pool_size = match optional_env("CAREDESK_DB_POOL_SIZE")? {
            Some(raw) => parse_pool_size(&raw)?,
            None => settings.database.pool_size.max(1),
        };

        Ok(Self {
            server: ServerConfig { listen, api_token },
            database: DatabaseConfig {
                backend,
                url,
                pool_size,
            },
            log: LogConfig {
                filter: parse_string_env("CAREDESK_LOG_FILTER", settings.log.filter.clone())?,
                json: parse_bool_env("CAREDESK_LOG_JSON", settings.log.json)?,
            },
        })
    }
}
