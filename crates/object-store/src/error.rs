//! Error types for setting up the object storage backend.

use std::path::PathBuf;

/// Errors that can occur while building a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local storage root is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// S3 bucket not found - the service never creates it
    #[error("S3 bucket '{0}' does not exist")]
    BucketNotFound(String),
}

/// Result type alias for storage setup.
pub type Result<T> = std::result::Result<T, StorageError>;
