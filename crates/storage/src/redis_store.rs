//! Redis storage implementation
//!
//! Tables are emulated with `prefix + tag + id` keys (see [`crate::keys`]).
//! Multi-field records are hashes, hotlinks are plain strings and the upload
//! defaults singleton is one JSON string.
//!
//! `get_all` walks the keyspace with `SCAN`, which is not atomic: keys added
//! or removed during the walk may or may not show up. Each page is its own
//! pool checkout. `delete_all` runs as one server-side script and removes every
//! key of the kind at once.
//!
//! Expiry hints are sent as relative `EXPIRE` seconds measured on the injected
//! clock, so the server's own wall clock never decides whether a key lives.

mod connection;

use crate::clock::Clock;
use crate::codec::{self, Layout, Record};
use crate::config::DbConnection;
use crate::error::{Result, StorageError};
use crate::gc::{Sweep, STALE_UPLOAD_AGE};
use crate::keys::{KeySpace, Kind};
use crate::pool::{Pool, PooledConnection};
use common::UploadStatus;
use connection::RedisManager;
use redis::Script;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

const SCAN_BATCH: usize = 100;

const DELETE_MATCHING: &str = r#"
local removed = 0
for _, key in ipairs(redis.call('KEYS', ARGV[1])) do
    removed = removed + redis.call('DEL', key)
end
return removed
"#;

/// ARGV: now, renewAt field, validUntil field
const DELETE_EXPIRED_SESSION: &str = r#"
local fields = redis.call('HMGET', KEYS[1], ARGV[2], ARGV[3])
local renew_at = tonumber(fields[1])
local valid_until = tonumber(fields[2])
if not renew_at or not valid_until then
    return 0
end
local now = tonumber(ARGV[1])
if renew_at <= now or valid_until <= now then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// ARGV: now, currentStatus field, lastUpdate field, in-progress value, max age
const DELETE_STALE_UPLOAD: &str = r#"
local fields = redis.call('HMGET', KEYS[1], ARGV[2], ARGV[3])
local status = tonumber(fields[1])
local last_update = tonumber(fields[2])
if not status or not last_update or status ~= tonumber(ARGV[4]) then
    return 0
end
if last_update == 0 or tonumber(ARGV[1]) - last_update > tonumber(ARGV[5]) then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub struct RedisProvider {
    pool: Pool<RedisManager>,
    keys: KeySpace,
    clock: Arc<dyn Clock>,
}

impl RedisProvider {
    /// Set up the pool and PING once so a bad host fails at startup
    pub async fn connect(config: &DbConnection, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.host_url.trim().is_empty() {
            return Err(StorageError::Config(
                "empty database url was provided".to_string(),
            ));
        }
        let manager = RedisManager::new(config)?;
        let provider = Self {
            pool: Pool::new(manager, config.pool.pool_options()),
            keys: KeySpace::new(config.redis_prefix.clone()),
            clock,
        };
        let mut conn = provider.conn().await?;
        let _: String = conn.query(&redis::cmd("PING")).await?;
        drop(conn);

        info!(host = %config.host_url, prefix = %config.redis_prefix, "Connected to Redis");
        Ok(provider)
    }

    async fn conn(&self) -> Result<PooledConnection<RedisManager>> {
        self.pool.get().await
    }

    pub async fn save<R: Record>(&self, id: &str, record: &R) -> Result<()> {
        let key = self.keys.key(R::KIND, id);
        let values = record.encode();

        let mut pipe = redis::pipe();
        pipe.atomic();
        match R::LAYOUT {
            Layout::Scalar => {
                let text = values.first().map(|value| value.to_text()).unwrap_or_default();
                pipe.cmd("SET").arg(&key).arg(text).ignore();
            }
            Layout::Blob => {
                pipe.cmd("SET").arg(&key).arg(codec::to_blob(record)).ignore();
            }
            Layout::Hash => {
                // HSET alone would merge into an existing hash
                pipe.cmd("DEL").arg(&key).ignore();
                let hset = pipe.cmd("HSET").arg(&key);
                for (column, value) in R::COLUMNS.iter().zip(&values) {
                    hset.arg(column.field).arg(value.to_text());
                }
                hset.ignore();
            }
        }
        if let Some(at) = record.expires_at() {
            // a non-positive EXPIRE deletes right away; leave those to the sweep
            let ttl = at.saturating_sub(self.clock.now());
            if ttl > 0 {
                pipe.cmd("EXPIRE").arg(&key).arg(ttl).ignore();
            }
        }

        let mut conn = self.conn().await?;
        let () = conn.query_pipeline(&pipe).await?;
        Ok(())
    }

    pub async fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let key = self.keys.key(R::KIND, id);
        self.fetch(&key, id).await
    }

    pub async fn get_all<R: Record>(&self) -> Result<HashMap<String, R>> {
        let mut records = HashMap::new();
        for key in self.scan(R::KIND).await? {
            let Some(id) = self.keys.id_of(R::KIND, &key) else {
                continue;
            };
            match self.fetch::<R>(&key, id).await? {
                Some(record) => {
                    records.insert(id.to_string(), record);
                }
                None => warn!(key = %key, "Key vanished during scan"),
            }
        }
        Ok(records)
    }

    pub async fn delete<R: Record>(&self, id: &str) -> Result<()> {
        let key = self.keys.key(R::KIND, id);
        let mut conn = self.conn().await?;
        let _: i64 = conn.query(redis::cmd("DEL").arg(&key)).await?;
        Ok(())
    }

    pub async fn delete_all<R: Record>(&self) -> Result<()> {
        let pattern = self.keys.pattern(R::KIND);
        let script = Script::new(DELETE_MATCHING);
        let mut invocation = script.prepare_invoke();
        invocation.arg(&pattern);

        let mut conn = self.conn().await?;
        let removed: i64 = conn.invoke(&invocation).await?;
        info!(kind = %R::KIND, removed, "Deleted all records");
        Ok(())
    }

    /// Compare-and-delete on the server: the policy is re-read from the hash
    pub(crate) async fn sweep(&self, sweep: Sweep, id: &str, now: i64) -> Result<bool> {
        let key = self.keys.key(sweep.kind(), id);
        let script = match sweep {
            Sweep::ExpiredSession => Script::new(DELETE_EXPIRED_SESSION),
            Sweep::StaleUpload => Script::new(DELETE_STALE_UPLOAD),
        };
        let mut invocation = script.key(&key);
        invocation.arg(now);
        match sweep {
            Sweep::ExpiredSession => {
                invocation.arg("renewAt").arg("validUntil");
            }
            Sweep::StaleUpload => {
                invocation
                    .arg("currentStatus")
                    .arg("lastUpdate")
                    .arg(UploadStatus::IN_PROGRESS)
                    .arg(STALE_UPLOAD_AGE);
            }
        }

        let mut conn = self.conn().await?;
        let removed: i64 = conn.invoke(&invocation).await?;
        Ok(removed > 0)
    }

    pub async fn get_version(&self) -> Result<i32> {
        let mut conn = self.conn().await?;
        let version: Option<i32> = conn
            .query(redis::cmd("GET").arg(self.keys.version_key()))
            .await?;
        Ok(version.unwrap_or(0))
    }

    pub async fn set_version(&self, version: i32) -> Result<()> {
        let mut conn = self.conn().await?;
        let () = conn
            .query(redis::cmd("SET").arg(self.keys.version_key()).arg(version))
            .await?;
        Ok(())
    }

    pub fn close(&self) {
        self.pool.close();
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    async fn fetch<R: Record>(&self, key: &str, id: &str) -> Result<Option<R>> {
        let mut conn = self.conn().await?;
        match R::LAYOUT {
            Layout::Hash => {
                let hash: HashMap<String, String> =
                    conn.query(redis::cmd("HGETALL").arg(key)).await?;
                if hash.is_empty() {
                    return Ok(None);
                }
                codec::from_hash(id, hash).map(Some)
            }
            Layout::Scalar => {
                let raw: Option<String> = conn.query(redis::cmd("GET").arg(key)).await?;
                raw.map(|raw| codec::from_scalar(id, &raw)).transpose()
            }
            Layout::Blob => {
                let raw: Option<String> = conn.query(redis::cmd("GET").arg(key)).await?;
                raw.map(|raw| codec::from_blob(id, &raw)).transpose()
            }
        }
    }

    /// Every key of `kind`, walking the cursor until it wraps to 0
    async fn scan(&self, kind: Kind) -> Result<BTreeSet<String>> {
        let pattern = self.keys.pattern(kind);
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let mut conn = self.conn().await?;
            let (next, batch): (u64, Vec<String>) = conn
                .query(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH),
                )
                .await?;
            // SCAN may report a key more than once
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}
