//! Streaming zip assembly.
//!
//! [`ArchiveBuilder`] walks a manifest in order, opens each object through an
//! [`ObjectFetcher`](crate::fetcher::ObjectFetcher) and deflates it into a zip
//! written straight to a sink. Nothing is buffered beyond one copy buffer and
//! whatever the encoder holds, so memory use does not depend on object size or
//! manifest length.
//!
//! A bad entry (missing key, missing object, failed read) is recorded in the
//! [`ArchiveSummary`] and skipped. A failed write to the sink ends the build:
//! the sink is the client connection and cannot be recovered.

mod builder;
mod summary;

use serde::{Deserialize, Serialize};

pub use builder::ArchiveBuilder;
pub use summary::{ArchiveSummary, EntryOutcome, EntryReport, SkipReason};

use crate::fetcher::FetchError;

/// Default size of the buffer each entry is copied through.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 32 * 1024;
/// Default capacity of the in-process pipe between builder and response body.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// What to do when an object cannot be opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    /// Leave the entry out and keep going, whatever the failure.
    #[default]
    Skip,
    /// Skip missing objects, but end the archive on a transient store
    /// failure so the client receives a truncated archive instead of a
    /// silently incomplete one.
    AbortOnTransient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,
    #[serde(default)]
    pub on_fetch_error: FetchFailurePolicy,
}

fn default_copy_buffer_size() -> usize {
    DEFAULT_COPY_BUFFER_SIZE
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            on_fetch_error: FetchFailurePolicy::default(),
        }
    }
}

/// Failures that end a build early.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Writing to the sink failed; the output is truncated
    #[error("sink write failed at {zip_path}: {source}")]
    Sink {
        zip_path: String,
        #[source]
        source: std::io::Error,
    },
    /// The consumer went away before the archive was complete
    #[error("archive build cancelled")]
    Cancelled,
    /// A fetch failure the configured policy does not tolerate
    #[error("archive aborted: {0}")]
    Aborted(FetchError),
    /// The zip encoder failed while closing an entry
    #[error("archive encoding failed: {0}")]
    Encoding(String),
    /// Writing the central directory failed
    #[error("failed to finalize archive: {0}")]
    Finalize(String),
}
