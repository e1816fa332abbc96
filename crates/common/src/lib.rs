/**
 * Streaming zip assembly.
 *  Drives a manifest through fetch and encode,
 *  writing straight into an output sink.
 */
pub mod archive;
/**
 * Object fetcher abstraction and its tagged
 *  error type. Backends live in their own crates.
 */
pub mod fetcher;
/**
 * The manifest model and its wire format as
 *  written by the producer into the key-value store.
 */
pub mod manifest;
/**
 * Reference resolver abstraction. Turns an opaque
 *  client token into a manifest.
 */
pub mod resolver;
/**
 * Character stripping for archive entry names
 *  and the archive path layout.
 */
pub mod sanitize;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub mod prelude {
    pub use crate::archive::{
        ArchiveBuilder, ArchiveConfig, ArchiveError, ArchiveSummary, EntryOutcome,
        FetchFailurePolicy, SkipReason,
    };
    pub use crate::fetcher::{ByteStream, FetchError, ObjectFetcher};
    pub use crate::manifest::{Manifest, ManifestEntry, ManifestError};
    pub use crate::resolver::{ManifestResolver, ResolveError};
    pub use crate::sanitize::{archive_path, sanitize, sanitize_or};
    pub use crate::version::BuildInfo;
}
