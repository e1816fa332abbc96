//! Object storage backend for zipper.
//!
//! Implements [`common::fetcher::ObjectFetcher`] on top of the `object_store`
//! crate, so the same archive pipeline can read from S3 (or anything speaking
//! its API, like MinIO), a local directory, or memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zipper_object_store::{ObjectStoreConfig, ObjectStoreFetcher};
//! use common::fetcher::ObjectFetcher;
//!
//! # async fn example() -> Result<(), zipper_object_store::StorageError> {
//! let config = ObjectStoreConfig::S3 {
//!     bucket: "files".to_string(),
//!     region: Some("eu-west-1".to_string()),
//!     endpoint: None,
//!     access_key: None,
//!     secret_key: None,
//! };
//! let fetcher: Arc<dyn ObjectFetcher> = Arc::new(ObjectStoreFetcher::new(config).await?);
//! # Ok(())
//! # }
//! ```

mod error;
mod storage;

pub use error::{Result, StorageError};
pub use storage::{ObjectStoreConfig, ObjectStoreFetcher};
