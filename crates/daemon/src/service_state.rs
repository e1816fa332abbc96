use std::sync::Arc;

use common::archive::{ArchiveBuilder, ArchiveConfig};
use common::fetcher::ObjectFetcher;
use common::resolver::ManifestResolver;
use object_store::{ObjectStoreFetcher, StorageError};
use tokio_util::sync::CancellationToken;

use crate::resolver::{PoolError, RedisResolver};
use crate::ServiceConfig;

/// Main service state, shared by every request.
///
/// Holds nothing request specific: each download resolves its own manifest
/// and gets its own output pipe.
#[derive(Clone)]
pub struct State {
    resolver: Arc<dyn ManifestResolver>,
    archive: ArchiveBuilder,
    draining: CancellationToken,
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        // 1. Manifest store
        let resolver = RedisResolver::new(&config.redis)?;
        tracing::info!(url = %redacted(&config.redis.url), "manifest store configured");

        // 2. Object store
        let fetcher = ObjectStoreFetcher::new(config.object_store.clone()).await?;
        tracing::info!(backend = ?backend_name(config), "object store ready");

        Ok(Self::new(
            Arc::new(resolver),
            Arc::new(fetcher),
            config.archive.clone(),
        ))
    }

    pub fn new(
        resolver: Arc<dyn ManifestResolver>,
        fetcher: Arc<dyn ObjectFetcher>,
        archive: ArchiveConfig,
    ) -> Self {
        Self {
            resolver,
            archive: ArchiveBuilder::new(fetcher, archive),
            draining: CancellationToken::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn ManifestResolver> {
        &self.resolver
    }

    pub fn archive(&self) -> &ArchiveBuilder {
        &self.archive
    }

    /// Cancelled once shutdown begins. Readiness fails from then on.
    pub fn draining(&self) -> &CancellationToken {
        &self.draining
    }
}

fn backend_name(config: &ServiceConfig) -> &'static str {
    match config.object_store {
        object_store::ObjectStoreConfig::Memory => "memory",
        object_store::ObjectStoreConfig::Local { .. } => "local",
        object_store::ObjectStoreConfig::S3 { .. } => "s3",
    }
}

/// Strip credentials from a connection URL before logging it.
fn redacted(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("manifest store setup error: {0}")]
    ManifestStore(#[from] PoolError),
    #[error("object store setup error: {0}")]
    ObjectStore(#[from] StorageError),
}
