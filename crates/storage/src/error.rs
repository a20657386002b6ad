//! Storage error type
//!
//! A missing record is not an error: lookups return `Ok(None)` and deletes of
//! absent ids succeed. Every `Err` is a backend fault; callers abort the unit
//! of work that hit it. Nothing in this crate retries.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed {kind} record {id:?}: {reason}")]
    Decode {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("database connection is closed")]
    Closed,

    #[error("invalid database configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn decode(kind: &'static str, id: &str, reason: impl Into<String>) -> Self {
        StorageError::Decode {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => StorageError::Closed,
            other => StorageError::Sqlite(other),
        }
    }
}
