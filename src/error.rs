//! Error types shared across the service.

use thiserror::Error;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {message}")]
    Unreadable { path: String, message: String },

    #[error("could not parse config file '{path}': {message}")]
    Malformed { path: String, message: String },

    #[error("invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Storage failures, shared by every backend.
///
/// `Conflict` is the only variant callers are expected to branch on: it
/// carries uniqueness and reference violations that map to a client-visible
/// 409. Everything else is an internal persistence failure.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("stored row could not be decoded: {0}")]
    Serialization(String),

    #[error("{0}")]
    Conflict(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for DatabaseError {
    fn from(err: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;

        // Constraint violations are domain conflicts (duplicate membership,
        // unknown group/clinician/location reference), not storage failures.
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code();
            if code == &SqlState::UNIQUE_VIOLATION || code == &SqlState::FOREIGN_KEY_VIOLATION {
                return DatabaseError::Conflict(db_err.message().to_string());
            }
        }
        DatabaseError::Query(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<refinery::Error> for DatabaseError {
    fn from(err: refinery::Error) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}

/// HTTP server startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start server on {addr}: {message}")]
    StartupFailed { addr: String, message: String },
}
