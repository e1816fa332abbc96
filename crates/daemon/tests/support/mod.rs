//! Shared helpers for router tests
#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use common::archive::ArchiveConfig;
use common::manifest::{Manifest, ManifestEntry};
use common::resolver::{ManifestResolver, ResolveError};
use common::testkit::{MemoryFetcher, MemoryResolver};
use tower::ServiceExt;
use zipper_daemon::{http_server, ServiceState};

pub fn entry(source_key: &str, display_name: &str) -> ManifestEntry {
    ManifestEntry {
        source_key: source_key.to_string(),
        display_name: display_name.to_string(),
        ..Default::default()
    }
}

pub fn router(resolver: Arc<MemoryResolver>, fetcher: Arc<MemoryFetcher>) -> Router {
    router_with(resolver, fetcher, ArchiveConfig::default())
}

pub fn router_with(
    resolver: Arc<dyn ManifestResolver>,
    fetcher: Arc<MemoryFetcher>,
    config: ArchiveConfig,
) -> Router {
    http_server::router(ServiceState::new(resolver, fetcher, config))
}

pub async fn get(router: Router, uri: &str) -> Response<Body> {
    router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn read_entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("archive should be readable");
    let mut entries = Vec::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        entries.push((file.name().to_string(), data));
    }
    entries
}

/// Incompressible bytes, so archives stay as large as their inputs.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

/// A resolver whose backing store is down
pub struct DownResolver;

#[async_trait]
impl ManifestResolver for DownResolver {
    async fn resolve(&self, _token: &str) -> Result<Manifest, ResolveError> {
        Err(ResolveError::Transient("connection refused".to_string()))
    }

    async fn check(&self) -> Result<(), ResolveError> {
        Err(ResolveError::Transient("connection refused".to_string()))
    }
}
