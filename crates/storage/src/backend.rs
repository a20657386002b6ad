use crate::clock::Clock;
use crate::config::{BackendKind, DbConnection};
use crate::error::Result;
use crate::redis_store::RedisProvider;
use crate::sqlite::SqliteProvider;
use std::sync::Arc;

/// The one active backend of this process
pub enum StorageBackend {
    Sqlite(SqliteProvider),
    Redis(RedisProvider),
}

impl StorageBackend {
    /// Initialize storage backend based on type
    pub async fn initialize(config: &DbConnection, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        match config.backend {
            BackendKind::Sqlite => {
                let provider = SqliteProvider::connect(&config.sqlite_path, &config.pool).await?;
                Ok(StorageBackend::Sqlite(provider))
            }
            BackendKind::Redis => {
                let provider = RedisProvider::connect(config, clock).await?;
                Ok(StorageBackend::Redis(provider))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            StorageBackend::Sqlite(_) => BackendKind::Sqlite,
            StorageBackend::Redis(_) => BackendKind::Redis,
        }
    }
}
