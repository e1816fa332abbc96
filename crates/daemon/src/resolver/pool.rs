use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::RedisConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A small bounded pool of Redis connections.
///
/// At most `max_connections` are handed out at once; further callers wait.
/// Returned connections are kept idle for reuse. On checkout, connections
/// idle past the idle timeout are dropped and those idle past the
/// test-on-borrow age must answer a `PING` first, otherwise a fresh
/// connection is opened.
#[derive(Clone)]
pub struct Pool {
    client: redis::Client,
    permits: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<IdleConnection>>>,
    opened: Arc<AtomicUsize>,
    idle_timeout: Duration,
    test_on_borrow_after: Duration,
}

struct IdleConnection {
    conn: MultiplexedConnection,
    since: Instant,
}

impl Pool {
    /// Validates the URL; no connection is opened until first use.
    pub fn new(config: &RedisConfig) -> Result<Self, PoolError> {
        let client = redis::Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
            idle: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(AtomicUsize::new(0)),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            test_on_borrow_after: Duration::from_secs(config.test_on_borrow_after_secs),
        })
    }

    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        loop {
            let candidate = self.idle.lock().pop();
            let Some(IdleConnection { mut conn, since }) = candidate else {
                break;
            };

            let idle_for = since.elapsed();
            if idle_for > self.idle_timeout {
                tracing::trace!(?idle_for, "closing expired idle redis connection");
                continue;
            }
            if idle_for > self.test_on_borrow_after {
                let pong: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut conn).await;
                if let Err(e) = pong {
                    tracing::debug!(error = %e, "idle redis connection failed ping");
                    continue;
                }
            }
            return Ok(self.wrap(conn, permit));
        }

        let conn = tokio::time::timeout(
            CONNECT_TIMEOUT,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| PoolError::Timeout)??;
        let opened = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(opened, "opened redis connection");

        Ok(self.wrap(conn, permit))
    }

    /// Connections currently parked for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Connections opened over the pool's lifetime.
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    fn wrap(&self, conn: MultiplexedConnection, permit: OwnedSemaphorePermit) -> PooledConnection {
        PooledConnection {
            conn,
            healthy: true,
            idle: self.idle.clone(),
            idle_timeout: self.idle_timeout,
            _permit: permit,
        }
    }
}

/// A checked out connection, returned to the pool on drop.
pub struct PooledConnection {
    conn: MultiplexedConnection,
    healthy: bool,
    idle: Arc<Mutex<Vec<IdleConnection>>>,
    idle_timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Drop the connection instead of returning it, after an I/O failure.
    pub fn discard(mut self) {
        self.healthy = false;
    }
}

impl Deref for PooledConnection {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if !self.healthy {
            return;
        }
        let mut idle = self.idle.lock();
        let timeout = self.idle_timeout;
        idle.retain(|c| c.since.elapsed() <= timeout);
        idle.push(IdleConnection {
            conn: self.conn.clone(),
            since: Instant::now(),
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("timed out connecting to redis")]
    Timeout,
    #[error("connection pool closed")]
    Closed,
}

impl PoolError {
    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PoolError::Redis(e) => is_transient(e),
            PoolError::Timeout => true,
            PoolError::Closed => false,
        }
    }
}

pub(crate) fn is_transient(err: &redis::RedisError) -> bool {
    err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        let config = RedisConfig {
            url: "definitely not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(Pool::new(&config), Err(PoolError::Redis(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        // Nothing listens on the discard port in a test environment
        let config = RedisConfig {
            url: "redis://127.0.0.1:9/".to_string(),
            ..Default::default()
        };
        let pool = Pool::new(&config).unwrap();
        let err = pool.get().await.err().unwrap();
        assert!(err.is_transient(), "unexpected error: {err}");
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.opened_count(), 0);
    }
}
