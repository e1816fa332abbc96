use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// The body of one fetched object, yielded chunk by chunk.
///
/// Dropping the stream closes the underlying read.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Tagged fetch failure, independent of the backing store.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No object under the key
    #[error("object not found: {0}")]
    NotFound(String),
    /// Network or service failure that may succeed on another attempt
    #[error("transient object store failure for {key}: {reason}")]
    Transient { key: String, reason: String },
    /// Permission, configuration, or any other failure
    #[error("object store failure for {key}: {reason}")]
    Other { key: String, reason: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Opens streaming reads against an object store.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<ByteStream, FetchError>;
}
