//! In-process resolver and fetcher doubles.
//!
//! Both count the calls made against them so tests can assert that a code
//! path never touched a store.
//!
//! ```rust,ignore
//! use common::testkit::{MemoryFetcher, MemoryResolver};
//!
//! let fetcher = MemoryFetcher::new().with_object("a.txt", "hello");
//! let resolver = MemoryResolver::new().with_manifest("token", manifest);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;

use crate::fetcher::{ByteStream, FetchError, ObjectFetcher};
use crate::manifest::Manifest;
use crate::resolver::{ManifestResolver, ResolveError};

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Default)]
pub struct MemoryResolver {
    manifests: Mutex<HashMap<String, Manifest>>,
    calls: AtomicUsize,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(self, token: &str, manifest: Manifest) -> Self {
        self.manifests.lock().insert(token.to_string(), manifest);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestResolver for MemoryResolver {
    async fn resolve(&self, token: &str) -> Result<Manifest, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.manifests
            .lock()
            .get(token)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }
}

#[derive(Clone)]
enum StoredObject {
    Data(Bytes),
    /// Yields the bytes, then a read error
    Interrupted(Bytes),
    Transient,
    Broken,
}

pub struct MemoryFetcher {
    objects: Mutex<HashMap<String, StoredObject>>,
    requested: Mutex<Vec<String>>,
    chunk_size: usize,
}

impl Default for MemoryFetcher {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            requested: Mutex::new(Vec::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_object(self, key: &str, data: impl Into<Bytes>) -> Self {
        self.insert(key, StoredObject::Data(data.into()))
    }

    /// The object opens fine but the read fails after `data`.
    pub fn with_interrupted(self, key: &str, data: impl Into<Bytes>) -> Self {
        self.insert(key, StoredObject::Interrupted(data.into()))
    }

    /// Opening the object fails with [`FetchError::Transient`].
    pub fn with_transient(self, key: &str) -> Self {
        self.insert(key, StoredObject::Transient)
    }

    /// Opening the object fails with [`FetchError::Other`].
    pub fn with_broken(self, key: &str) -> Self {
        self.insert(key, StoredObject::Broken)
    }

    fn insert(self, key: &str, object: StoredObject) -> Self {
        self.objects.lock().insert(key.to_string(), object);
        self
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().len()
    }

    /// Keys in the order they were fetched.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }

    fn chunked(&self, data: Bytes) -> Vec<std::io::Result<Bytes>> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + self.chunk_size).min(data.len());
            chunks.push(Ok(data.slice(offset..end)));
            offset = end;
        }
        chunks
    }
}

#[async_trait]
impl ObjectFetcher for MemoryFetcher {
    async fn fetch(&self, key: &str) -> Result<ByteStream, FetchError> {
        self.requested.lock().push(key.to_string());
        let object = self.objects.lock().get(key).cloned();
        match object {
            None => Err(FetchError::NotFound(key.to_string())),
            Some(StoredObject::Transient) => Err(FetchError::Transient {
                key: key.to_string(),
                reason: "connection reset".to_string(),
            }),
            Some(StoredObject::Broken) => Err(FetchError::Other {
                key: key.to_string(),
                reason: "access denied".to_string(),
            }),
            Some(StoredObject::Data(data)) => Ok(futures::stream::iter(self.chunked(data)).boxed()),
            Some(StoredObject::Interrupted(data)) => {
                let mut chunks = self.chunked(data);
                chunks.push(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset mid-body",
                )));
                Ok(futures::stream::iter(chunks).boxed())
            }
        }
    }
}
