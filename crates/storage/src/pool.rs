//! Bounded connection pool
//!
//! Connections are checked out for one round trip (or one small batch) and
//! come back on drop. Idle connections older than `idle_timeout` are dropped
//! on the next checkout, the rest are pinged first when `test_on_borrow` is
//! set. A connection marked broken is never handed out again.

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Dials and health-checks connections for a [`Pool`]
#[async_trait]
pub trait ManageConnection: Send + Sync + 'static {
    type Connection: Send + 'static;

    async fn connect(&self) -> Result<Self::Connection>;

    /// Liveness check run before an idle connection is reused
    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Connections checked out at once; further callers wait
    pub max_open: usize,
    /// Connections kept around between checkouts
    pub max_idle: usize,
    pub idle_timeout: Duration,
    pub test_on_borrow: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_open: 32,
            max_idle: 10,
            idle_timeout: Duration::from_secs(120),
            test_on_borrow: true,
        }
    }
}

struct Idle<C> {
    conn: C,
    since: Instant,
}

struct Shared<M: ManageConnection> {
    manager: M,
    options: PoolOptions,
    idle: Mutex<VecDeque<Idle<M::Connection>>>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
}

pub struct Pool<M: ManageConnection> {
    shared: Arc<Shared<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ManageConnection> Pool<M> {
    pub fn new(manager: M, options: PoolOptions) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_open.max(1)));
        Self {
            shared: Arc::new(Shared {
                manager,
                options,
                idle: Mutex::new(VecDeque::new()),
                permits,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub async fn get(&self) -> Result<PooledConnection<M>> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|_| StorageError::Closed)?;

        while let Some(idle) = self.take_idle() {
            if idle.since.elapsed() > self.shared.options.idle_timeout {
                debug!("Dropping connection idle past timeout");
                continue;
            }
            let mut conn = idle.conn;
            if self.shared.options.test_on_borrow {
                if let Err(err) = self.shared.manager.is_valid(&mut conn).await {
                    debug!(error = %err, "Discarding dead pooled connection");
                    continue;
                }
            }
            return Ok(self.wrap(conn, permit));
        }

        let conn = self.shared.manager.connect().await?;
        debug!("Opened new pooled connection");
        Ok(self.wrap(conn, permit))
    }

    /// Drops idle connections and fails every later checkout.
    /// Connections currently checked out are dropped when released.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.permits.close();
        self.shared.idle.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().len()
    }

    fn take_idle(&self) -> Option<Idle<M::Connection>> {
        // most recently used first, so stale ones age out at the front
        self.shared.idle.lock().pop_back()
    }

    fn wrap(&self, conn: M::Connection, permit: OwnedSemaphorePermit) -> PooledConnection<M> {
        PooledConnection {
            conn: Some(conn),
            shared: Arc::clone(&self.shared),
            broken: false,
            _permit: permit,
        }
    }
}

/// A checked-out connection, returned to the pool on drop
pub struct PooledConnection<M: ManageConnection> {
    conn: Option<M::Connection>,
    shared: Arc<Shared<M>>,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl<M: ManageConnection> PooledConnection<M> {
    /// Discard the connection on release instead of reusing it
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("pooled connection used after release")
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("pooled connection used after release")
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.broken {
            debug!("Dropping broken connection");
            return;
        }
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut idle = self.shared.idle.lock();
        if idle.len() < self.shared.options.max_idle {
            idle.push_back(Idle {
                conn,
                since: Instant::now(),
            });
        }
    }
}
