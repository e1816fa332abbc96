//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use common::fetcher::{ByteStream, FetchError, ObjectFetcher};
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage, keys are paths below `path`
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    ///
    /// Anything left unset is taken from the usual `AWS_*` environment.
    S3 {
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        #[serde(default)]
        region: Option<String>,
        /// Endpoint URL (e.g., "http://localhost:9000" for MinIO)
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key ID
        #[serde(default)]
        access_key: Option<String>,
        /// Secret access key
        #[serde(default)]
        secret_key: Option<String>,
    },
}

/// Streams objects out of an [`ObjectStore`].
///
/// Cheap to clone; the underlying client holds no per-request state and is
/// shared by every download.
#[derive(Debug, Clone)]
pub struct ObjectStoreFetcher {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreFetcher {
    /// Create a new fetcher from configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                if !tokio::fs::metadata(path).await?.is_dir() {
                    return Err(StorageError::NotADirectory(path.clone()));
                }
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| StorageError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key,
                secret_key,
            } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                } else if std::env::var("AWS_REGION").is_err()
                    && std::env::var("AWS_DEFAULT_REGION").is_err()
                {
                    builder = builder.with_region(DEFAULT_REGION);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(access_key) = access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| StorageError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket doesn't exist
                let prefix = ObjectPath::from("");
                let mut stream = store.list(Some(&prefix));
                match stream.try_next().await {
                    Ok(_) => {}
                    Err(object_store::Error::NotFound { .. }) => {
                        return Err(StorageError::BucketNotFound(bucket.clone()));
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if msg.contains("NoSuchBucket") {
                            return Err(StorageError::BucketNotFound(bucket.clone()));
                        }
                        return Err(e.into());
                    }
                }
                drop(stream);

                store
            }
        };

        Ok(Self { inner })
    }

    /// Wrap an already built store.
    pub fn from_store(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.inner
    }
}

#[async_trait]
impl ObjectFetcher for ObjectStoreFetcher {
    async fn fetch(&self, key: &str) -> std::result::Result<ByteStream, FetchError> {
        let path = ObjectPath::parse(key).map_err(|e| FetchError::Other {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        // Parsing trims stray delimiters, which would name a different object
        if path.as_ref() != key {
            return Err(FetchError::Other {
                key: key.to_string(),
                reason: format!("not a canonical store path, parses as \"{path}\""),
            });
        }

        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|e| classify(key, e))?;

        tracing::trace!(key, size = result.meta.size, "object found");

        let stream = result
            .into_stream()
            .map_err(|e| std::io::Error::other(e.to_string()));
        Ok(stream.boxed())
    }
}

/// Map an `object_store` error onto the fetcher taxonomy.
///
/// `Generic` is what the HTTP backed stores report for network and server
/// side failures, so it counts as transient.
fn classify(key: &str, err: object_store::Error) -> FetchError {
    match err {
        object_store::Error::NotFound { .. } => FetchError::NotFound(key.to_string()),
        object_store::Error::Generic { .. } => FetchError::Transient {
            key: key.to_string(),
            reason: err.to_string(),
        },
        other => FetchError::Other {
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}
