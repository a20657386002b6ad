//! Shared setup: every test runs against SQLite, and against Redis as well
//! when `STORAGE_TEST_REDIS_HOST` points at a server.

#![allow(dead_code)]

use common::{ApiKey, FileMetadata, Hotlink, Session, UploadDefaults, UploadStatus};
use std::sync::Arc;
use storage::{Clock, Database, DbConnection, ManualClock, SystemClock};
use tempfile::TempDir;

pub const REDIS_HOST_VAR: &str = "STORAGE_TEST_REDIS_HOST";

pub struct Harness {
    pub name: &'static str,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    _dir: Option<TempDir>,
}

impl Harness {
    /// Removes everything this harness wrote to a shared server
    pub async fn cleanup(&self) {
        if self.name != "redis" || self.db.is_closed() {
            return;
        }
        self.db.delete_all::<FileMetadata>().await.unwrap();
        self.db.delete_all::<Hotlink>().await.unwrap();
        self.db.delete_all::<ApiKey>().await.unwrap();
        self.db.delete_all::<Session>().await.unwrap();
        self.db.delete_all::<UploadStatus>().await.unwrap();
        self.db.delete_all::<UploadDefaults>().await.unwrap();
    }
}

pub async fn sqlite() -> Harness {
    sqlite_at(ManualClock::starting_now()).await
}

pub async fn sqlite_at(clock: ManualClock) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(clock);
    let config = DbConnection::sqlite(dir.path().join("test.sqlite"));
    let db = Database::init_with_clock(&config, clock.clone()).await.unwrap();
    Harness {
        name: "sqlite",
        db,
        clock,
        _dir: Some(dir),
    }
}

pub async fn redis() -> Option<Harness> {
    redis_with(ManualClock::starting_now(), |_| {}).await
}

/// `configure` may adjust the connection settings before connecting
pub async fn redis_with(
    clock: ManualClock,
    configure: impl FnOnce(&mut DbConnection),
) -> Option<Harness> {
    let host = std::env::var(REDIS_HOST_VAR).ok()?;
    let clock = Arc::new(clock);
    let prefix = format!("test:{}:", uuid::Uuid::new_v4());
    let mut config = DbConnection::redis(host, prefix);
    configure(&mut config);
    let db = Database::init_with_clock(&config, clock.clone()).await.unwrap();
    Some(Harness {
        name: "redis",
        db,
        clock,
        _dir: None,
    })
}

pub async fn harnesses() -> Vec<Harness> {
    let mut all = vec![sqlite().await];
    all.extend(redis().await);
    all
}

/// Both backends with a clock fixed at `now`, however far that is from wall time
pub async fn harnesses_at(now: i64) -> Vec<Harness> {
    let mut all = vec![sqlite_at(ManualClock::new(now)).await];
    all.extend(redis_with(ManualClock::new(now), |_| {}).await);
    all
}

pub fn file(id: &str, name: &str) -> FileMetadata {
    FileMetadata {
        id: id.to_string(),
        name: name.to_string(),
        size: "3 B".to_string(),
        sha1: "a9993e364706816aba3e25717850c26c9cd0d89d".to_string(),
        content_type: "text/plain".to_string(),
        expire_at: SystemClock.now() + 3600,
        expire_at_string: "in an hour".to_string(),
        size_bytes: 3,
        downloads_remaining: 1,
        ..Default::default()
    }
}

pub fn upload_status(chunk_id: &str, current_status: i64, last_update: i64) -> UploadStatus {
    UploadStatus {
        chunk_id: chunk_id.to_string(),
        current_status,
        last_update,
    }
}
