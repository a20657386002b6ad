//! SQLite storage implementation
//!
//! One table per entity kind, keyed by `id`. Tables already separate the
//! kinds, so no key prefixing happens here.

mod queries;
mod schema;

use crate::codec::Record;
use crate::config::{PoolSettings, SQLITE_MEMORY};
use crate::error::{Result, StorageError};
use crate::gc::Sweep;
use queries::Queries;
use schema::Schema;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Open (creating if needed) the database at `path` and its tables
    pub async fn connect(path: &Path, settings: &PoolSettings) -> Result<Self> {
        let in_memory = path.as_os_str() == SQLITE_MEMORY;
        let options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StorageError::Config(format!("cannot create {}: {err}", parent.display()))
                })?;
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
        };

        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(settings.max_open.max(1))
                .idle_timeout(settings.idle_timeout())
        };

        let pool = pool_options
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        Schema::initialize(&pool).await?;
        info!(path = %path.display(), "Connected to SQLite database");
        Ok(Self { pool })
    }

    pub async fn save<R: Record>(&self, id: &str, record: &R) -> Result<()> {
        Queries::upsert(&self.pool, id, record).await
    }

    pub async fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        Queries::select(&self.pool, id).await
    }

    pub async fn get_all<R: Record>(&self) -> Result<HashMap<String, R>> {
        Queries::select_all(&self.pool).await
    }

    pub async fn delete<R: Record>(&self, id: &str) -> Result<()> {
        Queries::delete(&self.pool, R::KIND, id).await
    }

    pub async fn delete_all<R: Record>(&self) -> Result<()> {
        let removed = Queries::delete_all(&self.pool, R::KIND).await?;
        info!(kind = %R::KIND, removed, "Deleted all records");
        Ok(())
    }

    pub(crate) async fn sweep(&self, sweep: Sweep, id: &str, now: i64) -> Result<bool> {
        Queries::delete_if(&self.pool, sweep, id, now).await
    }

    pub async fn get_version(&self) -> Result<i32> {
        Queries::user_version(&self.pool).await
    }

    pub async fn set_version(&self, version: i32) -> Result<()> {
        Queries::set_user_version(&self.pool, version).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
