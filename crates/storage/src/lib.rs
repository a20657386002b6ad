//! Persistence layer for file metadata, hotlinks, API keys, sessions, upload
//! progress, upload defaults and the schema version marker.
//!
//! One logical data model sits on top of either SQLite or Redis; which one is
//! decided once at startup by [`DbConnection`]. All operations go through a
//! [`Database`] handle.

pub mod backend;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod gc;
pub mod keys;
pub mod pool;
pub mod redis_store;
mod records;
pub mod sqlite;

use common::{ApiKey, FileMetadata, Hotlink, UploadDefaults, UploadStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub use backend::StorageBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::Record;
pub use config::{BackendKind, DbConnection};
pub use error::{Result, StorageError};
pub use gc::GcReport;
pub use keys::Kind;

/// Runs the same expression against whichever provider is active
macro_rules! with_provider {
    ($backend:expr, $provider:ident => $body:expr) => {
        match $backend {
            StorageBackend::Sqlite($provider) => $body,
            StorageBackend::Redis($provider) => $body,
        }
    };
}

/// Handle to the active backend
///
/// Share it by reference (or behind an `Arc`) across tasks. Each call
/// touches a single key, or a single kind for the bulk operations; nothing
/// is transactional across calls and concurrent saves to one id are
/// last-write-wins.
pub struct Database {
    backend: StorageBackend,
    clock: Arc<dyn Clock>,
}

impl Database {
    /// Connect using the system clock
    pub async fn init(config: &DbConnection) -> Result<Self> {
        Self::init_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Connect with a custom time source for expiry decisions
    pub async fn init_with_clock(config: &DbConnection, clock: Arc<dyn Clock>) -> Result<Self> {
        let backend = StorageBackend::initialize(config, Arc::clone(&clock)).await?;
        info!(backend = ?backend.kind(), "Database initialized");
        Ok(Self { backend, clock })
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Insert or fully replace the record stored under `id`
    pub async fn save<R: Record>(&self, id: &str, record: &R) -> Result<()> {
        with_provider!(&self.backend, p => p.save(id, record).await)
    }

    /// `Ok(None)` when no record exists
    pub async fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        with_provider!(&self.backend, p => p.get(id).await)
    }

    /// Every record of the kind, keyed by id. Best effort on Redis: records
    /// written or removed while the scan runs may be missed.
    pub async fn get_all<R: Record>(&self) -> Result<HashMap<String, R>> {
        with_provider!(&self.backend, p => p.get_all().await)
    }

    /// Removing an absent id is a no-op
    pub async fn delete<R: Record>(&self, id: &str) -> Result<()> {
        with_provider!(&self.backend, p => p.delete::<R>(id).await)
    }

    /// Remove every record of the kind in one backend round trip
    pub async fn delete_all<R: Record>(&self) -> Result<()> {
        with_provider!(&self.backend, p => p.delete_all::<R>().await)
    }

    /// Schema version marker, 0 if never set
    pub async fn get_version(&self) -> Result<i32> {
        with_provider!(&self.backend, p => p.get_version().await)
    }

    pub async fn set_version(&self, version: i32) -> Result<()> {
        with_provider!(&self.backend, p => p.set_version(version).await)
    }

    pub async fn save_metadata(&self, file: &FileMetadata) -> Result<()> {
        self.save(&file.id, file).await
    }

    /// Point the file's hotlink at it; files without a hotlink are skipped
    pub async fn save_hotlink(&self, file: &FileMetadata) -> Result<()> {
        match file.hotlink_id.as_deref() {
            Some(hotlink_id) if !hotlink_id.is_empty() => {
                let hotlink = Hotlink {
                    file_id: file.id.clone(),
                };
                self.save(hotlink_id, &hotlink).await
            }
            _ => Ok(()),
        }
    }

    /// File id the hotlink resolves to
    pub async fn get_hotlink(&self, hotlink_id: &str) -> Result<Option<String>> {
        Ok(self
            .get::<Hotlink>(hotlink_id)
            .await?
            .map(|hotlink| hotlink.file_id))
    }

    pub async fn save_api_key(&self, key: &ApiKey) -> Result<()> {
        self.save(&key.id, key).await
    }

    pub async fn save_upload_status(&self, status: &UploadStatus) -> Result<()> {
        self.save(&status.chunk_id, status).await
    }

    /// Last used upload values, or the built-in defaults if none were saved
    pub async fn get_upload_defaults(&self) -> Result<UploadDefaults> {
        Ok(self
            .get::<UploadDefaults>(keys::SINGLETON_ID)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_upload_defaults(&self, defaults: &UploadDefaults) -> Result<()> {
        self.save(keys::SINGLETON_ID, defaults).await
    }

    /// Remove expired sessions and stale upload progress, see [`gc`]
    pub async fn run_garbage_collection(&self) -> Result<GcReport> {
        gc::run(self).await
    }

    /// `true` if the record matched `sweep` at `now` and was removed
    pub(crate) async fn sweep(&self, sweep: gc::Sweep, id: &str, now: i64) -> Result<bool> {
        with_provider!(&self.backend, p => p.sweep(sweep, id, now).await)
    }

    /// Release pooled connections. Every later call fails with
    /// [`StorageError::Closed`].
    pub async fn close(&self) {
        match &self.backend {
            StorageBackend::Sqlite(p) => p.close().await,
            StorageBackend::Redis(p) => p.close(),
        }
        info!("Database closed");
    }

    pub fn is_closed(&self) -> bool {
        with_provider!(&self.backend, p => p.is_closed())
    }
}
