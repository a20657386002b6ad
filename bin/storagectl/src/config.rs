//! Connection settings: command line flags over environment over defaults

use clap::Args;
use std::path::PathBuf;
use storage::{BackendKind, DbConnection};

#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Storage backend: 'sqlite' or 'redis' (or STORAGE_TYPE env var)
    #[arg(long, global = true, value_name = "TYPE")]
    pub backend: Option<BackendKind>,
    /// SQLite database file, ':memory:' for a throwaway database (or SQLITE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub sqlite_path: Option<PathBuf>,
    /// Redis host:port (or REDIS_HOST)
    #[arg(long, global = true, value_name = "HOST")]
    pub redis_host: Option<String>,
    /// Redis ACL user (or REDIS_USERNAME)
    #[arg(long, global = true)]
    pub redis_username: Option<String>,
    /// Redis password (or REDIS_PASSWORD)
    #[arg(long, global = true)]
    pub redis_password: Option<String>,
    /// Connect to Redis over TLS (or REDIS_USE_TLS)
    #[arg(long, global = true)]
    pub redis_tls: bool,
    /// Prefix for every Redis key (or REDIS_PREFIX)
    #[arg(long, global = true, value_name = "PREFIX")]
    pub redis_prefix: Option<String>,
}

impl ConnectionArgs {
    pub fn load(&self) -> anyhow::Result<DbConnection> {
        let config = DbConnection::from_env()?;
        Ok(self.apply(config))
    }

    fn apply(&self, mut config: DbConnection) -> DbConnection {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(path) = &self.sqlite_path {
            config.sqlite_path = path.clone();
        }
        if let Some(host) = &self.redis_host {
            config.host_url = host.clone();
        }
        if let Some(username) = &self.redis_username {
            config.username = username.clone();
        }
        if let Some(password) = &self.redis_password {
            config.password = password.clone();
        }
        if self.redis_tls {
            config.use_tls = true;
        }
        if let Some(prefix) = &self.redis_prefix {
            config.redis_prefix = prefix.clone();
        }
        config
    }
}
