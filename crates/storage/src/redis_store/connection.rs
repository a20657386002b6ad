use crate::config::DbConnection;
use crate::error::{Result, StorageError};
use crate::pool::{ManageConnection, PooledConnection};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue, Pipeline, RedisError, RedisResult, ScriptInvocation};
use url::Url;

/// Name reported by `CLIENT LIST` for our connections
const CLIENT_NAME: &str = "filestore";

/// Dials Redis connections for the pool
pub struct RedisManager {
    client: redis::Client,
}

impl RedisManager {
    pub fn new(config: &DbConnection) -> Result<Self> {
        let url = connection_url(config)?;
        let client = redis::Client::open(url.as_str())?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ManageConnection for RedisManager {
    type Connection = MultiplexedConnection;

    async fn connect(&self) -> Result<MultiplexedConnection> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("CLIENT")
            .arg("SETNAME")
            .arg(CLIENT_NAME)
            .query_async(&mut conn)
            .await?;
        Ok(conn)
    }

    async fn is_valid(&self, conn: &mut MultiplexedConnection) -> Result<()> {
        let _: String = redis::cmd("PING").query_async(conn).await?;
        Ok(())
    }
}

/// Builds `redis[s]://[user[:password]@]host` with credentials escaped
fn connection_url(config: &DbConnection) -> Result<Url> {
    let scheme = if config.use_tls { "rediss" } else { "redis" };
    let host = config.host_url.trim();
    let mut url = Url::parse(&format!("{scheme}://{host}"))
        .map_err(|err| StorageError::Config(format!("invalid redis host {host:?}: {err}")))?;
    if !config.username.is_empty() {
        url.set_username(&config.username)
            .map_err(|_| StorageError::Config("redis username cannot be used".to_string()))?;
    }
    if !config.password.is_empty() {
        url.set_password(Some(&config.password))
            .map_err(|_| StorageError::Config("redis password cannot be used".to_string()))?;
    }
    Ok(url)
}

impl PooledConnection<RedisManager> {
    pub(super) async fn query<T: FromRedisValue>(&mut self, cmd: &Cmd) -> Result<T> {
        let result: RedisResult<T> = cmd.query_async(&mut **self).await;
        self.check(result)
    }

    pub(super) async fn query_pipeline<T: FromRedisValue>(&mut self, pipe: &Pipeline) -> Result<T> {
        let result: RedisResult<T> = pipe.query_async(&mut **self).await;
        self.check(result)
    }

    pub(super) async fn invoke<T: FromRedisValue>(
        &mut self,
        script: &ScriptInvocation<'_>,
    ) -> Result<T> {
        let result: RedisResult<T> = script.invoke_async(&mut **self).await;
        self.check(result)
    }

    /// Connection-level failures retire the connection
    fn check<T>(&mut self, result: RedisResult<T>) -> Result<T> {
        result.map_err(|err| {
            if is_connection_failure(&err) {
                self.mark_broken();
            }
            StorageError::Redis(err)
        })
    }
}

fn is_connection_failure(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}
