use crate::error::{Result, StorageError};
use crate::pool::PoolOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Path that selects a private in-memory SQLite database
pub const SQLITE_MEMORY: &str = ":memory:";

/// Default SQLite database file
pub const DEFAULT_SQLITE_PATH: &str = "data/filestore.sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Redis,
}

impl BackendKind {
    /// Numeric id used by the surrounding system (0 = SQLite, 1 = Redis)
    pub fn id(self) -> u8 {
        match self {
            BackendKind::Sqlite => 0,
            BackendKind::Redis => 1,
        }
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "redis" => Ok(BackendKind::Redis),
            other => Err(StorageError::Config(format!(
                "unknown storage type {other:?}, expected 'sqlite' or 'redis'"
            ))),
        }
    }
}

/// Pool sizing shared by both backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_open: u32,
    pub max_idle: u32,
    pub idle_timeout_seconds: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: 32,
            max_idle: 10,
            idle_timeout_seconds: 120,
        }
    }
}

impl PoolSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_open: self.max_open as usize,
            max_idle: self.max_idle as usize,
            idle_timeout: self.idle_timeout(),
            test_on_borrow: true,
        }
    }
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConnection {
    #[serde(rename = "type")]
    pub backend: BackendKind,
    pub sqlite_path: PathBuf,
    /// `host:port` of the Redis server
    pub host_url: String,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    /// Prepended to every Redis key
    pub redis_prefix: String,
    pub pool: PoolSettings,
}

impl Default for DbConnection {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            host_url: String::new(),
            username: String::new(),
            password: String::new(),
            use_tls: false,
            redis_prefix: String::new(),
            pool: PoolSettings::default(),
        }
    }
}

impl DbConnection {
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            sqlite_path: path.into(),
            ..Self::default()
        }
    }

    pub fn redis(host_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Redis,
            host_url: host_url.into(),
            redis_prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Load settings from `STORAGE_TYPE`, `SQLITE_PATH`, `REDIS_HOST`,
    /// `REDIS_USERNAME`, `REDIS_PASSWORD`, `REDIS_USE_TLS` and `REDIS_PREFIX`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(kind) = lookup("STORAGE_TYPE") {
            config.backend = kind.parse()?;
        }
        if let Some(path) = lookup("SQLITE_PATH") {
            config.sqlite_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("REDIS_HOST") {
            config.host_url = host;
        }
        if let Some(username) = lookup("REDIS_USERNAME") {
            config.username = username;
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            config.password = password;
        }
        if let Some(tls) = lookup("REDIS_USE_TLS") {
            config.use_tls = parse_flag("REDIS_USE_TLS", &tls)?;
        }
        if let Some(prefix) = lookup("REDIS_PREFIX") {
            config.redis_prefix = prefix;
        }
        Ok(config)
    }

    /// Checks the settings the selected backend needs
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            BackendKind::Redis if self.host_url.trim().is_empty() => Err(StorageError::Config(
                "empty database url was provided".to_string(),
            )),
            BackendKind::Sqlite if self.sqlite_path.as_os_str().is_empty() => Err(
                StorageError::Config("empty sqlite path was provided".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(StorageError::Config(format!(
            "{name} must be true or false, got {raw:?}"
        ))),
    }
}
