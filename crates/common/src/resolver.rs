use async_trait::async_trait;

use crate::manifest::{Manifest, ManifestError};

/// Prefix under which the producer stores manifests in the key-value store.
pub const MANIFEST_KEY_PREFIX: &str = "zip:";

/// Key-value store key for a reference token.
pub fn manifest_key(token: &str) -> String {
    format!("{}{}", MANIFEST_KEY_PREFIX, token)
}

/// Why a token could not be resolved.
///
/// The variants exist for logging and tests only. Callers facing a client
/// collapse all of them into one access-denied answer so a response never
/// reveals whether a token ever existed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No manifest under this token (never written, or expired)
    #[error("no manifest for token")]
    NotFound,
    /// The stored payload is not a manifest
    #[error(transparent)]
    Malformed(#[from] ManifestError),
    /// The store could not be reached or timed out
    #[error("transient key-value store failure: {0}")]
    Transient(String),
    /// Any other store failure
    #[error("key-value store failure: {0}")]
    Other(String),
}

/// Resolves opaque reference tokens into manifests.
///
/// Implementations perform exactly one lookup per call with no retry and no
/// caching; every request sees a freshly resolved manifest.
#[async_trait]
pub trait ManifestResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Manifest, ResolveError>;

    /// Cheap liveness probe of the backing store, used for readiness.
    async fn check(&self) -> Result<(), ResolveError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_key() {
        assert_eq!(manifest_key("abc123"), "zip:abc123");
        assert_eq!(manifest_key(""), "zip:");
    }
}
