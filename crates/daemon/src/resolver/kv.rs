use std::time::Duration;

use async_trait::async_trait;
use common::manifest::Manifest;
use common::resolver::{manifest_key, ManifestResolver, ResolveError};

use super::pool::{is_transient, Pool, PoolError};
use crate::config::RedisConfig;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves tokens with a single `GET zip:<token>`.
#[derive(Clone)]
pub struct RedisResolver {
    pool: Pool,
}

impl RedisResolver {
    pub fn new(config: &RedisConfig) -> Result<Self, PoolError> {
        Ok(Self {
            pool: Pool::new(config)?,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn query<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T, ResolveError> {
        let mut conn = self.pool.get().await?;
        let result: Result<redis::RedisResult<T>, _> =
            tokio::time::timeout(COMMAND_TIMEOUT, cmd.query_async(&mut *conn)).await;
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let transient = is_transient(&e);
                if transient {
                    conn.discard();
                    return Err(ResolveError::Transient(e.to_string()));
                }
                Err(ResolveError::Other(e.to_string()))
            }
            Err(_) => {
                conn.discard();
                Err(ResolveError::Transient("redis command timed out".to_string()))
            }
        }
    }
}

impl From<PoolError> for ResolveError {
    fn from(err: PoolError) -> Self {
        if err.is_transient() {
            ResolveError::Transient(err.to_string())
        } else {
            ResolveError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl ManifestResolver for RedisResolver {
    async fn resolve(&self, token: &str) -> Result<Manifest, ResolveError> {
        let key = manifest_key(token);
        let mut cmd = redis::cmd("GET");
        cmd.arg(&key);

        let payload: Option<Vec<u8>> = self.query(cmd).await?;
        let payload = payload.ok_or(ResolveError::NotFound)?;
        tracing::trace!(%key, bytes = payload.len(), "manifest payload fetched");

        Ok(Manifest::from_slice(&payload)?)
    }

    async fn check(&self) -> Result<(), ResolveError> {
        let _: String = self.query(redis::cmd("PING")).await?;
        Ok(())
    }
}
