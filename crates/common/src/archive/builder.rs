use std::sync::Arc;

use async_zip::base::write::ZipFileWriter;
use async_zip::error::ZipError;
use async_zip::{Compression, ZipDateTime, ZipDateTimeBuilder, ZipEntryBuilder};
use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::AsyncWriteExt as _;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use super::{ArchiveConfig, ArchiveError, ArchiveSummary, FetchFailurePolicy, SkipReason};
use crate::fetcher::ObjectFetcher;
use crate::manifest::{Manifest, ManifestEntry};
use crate::sanitize::archive_path;

/// Writes manifests out as zip archives.
///
/// Cheap to clone; one builder is shared by every request.
#[derive(Clone)]
pub struct ArchiveBuilder {
    fetcher: Arc<dyn ObjectFetcher>,
    config: ArchiveConfig,
}

enum EntryError {
    /// The archive would not take the entry; nothing was written for it
    Rejected(String),
    /// The source failed mid-copy; the entry was closed with what was read
    Truncated { copied: u64, reason: String },
    /// The build cannot continue
    Fatal(ArchiveError),
}

impl ArchiveBuilder {
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, config: ArchiveConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Stream `manifest` into `sink` as a zip archive.
    ///
    /// Entries are written strictly in manifest order. The central directory
    /// is written once, after the last entry. On error the sink is left with a
    /// truncated archive and no trailer.
    ///
    /// `cancel` ends the build at the next fetch or read.
    pub async fn build<W>(
        &self,
        manifest: &Manifest,
        sink: W,
        cancel: &CancellationToken,
    ) -> Result<ArchiveSummary, ArchiveError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = ZipFileWriter::with_tokio(sink);
        let mut summary = ArchiveSummary::default();
        let mut buf = vec![0u8; self.config.copy_buffer_size.max(1)];

        for (index, entry) in manifest.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }

            if entry.source_key.is_empty() {
                tracing::warn!(
                    index,
                    file = %entry.display_name,
                    "skipping entry with empty source key"
                );
                summary.skip(index, None, SkipReason::MissingSourceKey);
                continue;
            }

            let zip_path = archive_path(entry);

            tracing::debug!(key = %entry.source_key, "fetching object");
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ArchiveError::Cancelled),
                fetched = self.fetcher.fetch(&entry.source_key) => fetched,
            };

            let stream = match fetched {
                Ok(stream) => stream,
                Err(err) => {
                    if err.is_not_found() {
                        tracing::warn!(key = %entry.source_key, "object not found, skipping");
                    } else {
                        tracing::error!(
                            key = %entry.source_key,
                            error = %err,
                            "failed to fetch object"
                        );
                    }
                    if err.is_transient()
                        && self.config.on_fetch_error == FetchFailurePolicy::AbortOnTransient
                    {
                        return Err(ArchiveError::Aborted(err));
                    }
                    summary.skip(index, Some(zip_path), SkipReason::from(&err));
                    continue;
                }
            };

            let reader = StreamReader::new(stream);
            match copy_entry(&mut writer, &zip_path, entry, reader, &mut buf, cancel).await {
                Ok(copied) => {
                    tracing::debug!(zip_path = %zip_path, bytes = copied, "added entry");
                    summary.include(index, zip_path, copied);
                }
                Err(EntryError::Rejected(reason)) => {
                    tracing::error!(zip_path = %zip_path, reason = %reason, "entry rejected");
                    summary.skip(index, Some(zip_path), SkipReason::Rejected(reason));
                }
                Err(EntryError::Truncated { copied, reason }) => {
                    tracing::error!(
                        zip_path = %zip_path,
                        bytes = copied,
                        reason = %reason,
                        "object read failed, entry truncated"
                    );
                    summary.skip(index, Some(zip_path), SkipReason::Truncated(reason));
                }
                Err(EntryError::Fatal(err)) => {
                    tracing::error!(
                        error = %err,
                        included = summary.included(),
                        skipped = summary.skipped(),
                        "aborting archive"
                    );
                    return Err(err);
                }
            }
        }

        let sink = writer.close().await.map_err(|e| {
            tracing::error!(error = %e, "failed to write central directory");
            ArchiveError::Finalize(e.to_string())
        })?;
        let mut sink = sink.into_inner();
        sink.shutdown().await.map_err(|e| {
            tracing::error!(error = %e, "failed to flush archive");
            ArchiveError::Finalize(e.to_string())
        })?;

        Ok(summary)
    }
}

async fn copy_entry<W, R>(
    writer: &mut ZipFileWriter<W>,
    zip_path: &str,
    entry: &ManifestEntry,
    mut reader: R,
    buf: &mut [u8],
    cancel: &CancellationToken,
) -> Result<u64, EntryError>
where
    W: futures::io::AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    // String names are flagged as UTF-8 in the local and central headers.
    let mut header = ZipEntryBuilder::new(zip_path.to_string().into(), Compression::Deflate);
    if let Some(modified) = entry.modified_at.and_then(zip_datetime) {
        header = header.last_modification_date(modified);
    }

    let mut entry_writer = writer
        .write_entry_stream(header)
        .await
        .map_err(|e| match e {
            ZipError::UpstreamReadError(source) => EntryError::Fatal(ArchiveError::Sink {
                zip_path: zip_path.to_string(),
                source,
            }),
            other => EntryError::Rejected(other.to_string()),
        })?;

    let mut copied = 0u64;
    let mut interrupted = None;
    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EntryError::Fatal(ArchiveError::Cancelled)),
            read = reader.read(buf) => read,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                interrupted = Some(e.to_string());
                break;
            }
        };
        entry_writer.write_all(&buf[..n]).await.map_err(|source| {
            EntryError::Fatal(ArchiveError::Sink {
                zip_path: zip_path.to_string(),
                source,
            })
        })?;
        copied += n as u64;
    }
    drop(reader);

    entry_writer.close().await.map_err(|e| match e {
        ZipError::UpstreamReadError(source) => EntryError::Fatal(ArchiveError::Sink {
            zip_path: zip_path.to_string(),
            source,
        }),
        other => EntryError::Fatal(ArchiveError::Encoding(other.to_string())),
    })?;

    match interrupted {
        Some(reason) => Err(EntryError::Truncated { copied, reason }),
        None => Ok(copied),
    }
}

/// DOS timestamps only cover 1980 through 2107.
fn zip_datetime(at: DateTime<Utc>) -> Option<ZipDateTime> {
    if !(1980..=2107).contains(&at.year()) {
        return None;
    }
    Some(
        ZipDateTimeBuilder::new()
            .year(at.year())
            .month(at.month())
            .day(at.day())
            .hour(at.hour())
            .minute(at.minute())
            .second(at.second())
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_zip_datetime_in_range() {
        let at = Utc.with_ymd_and_hms(2015, 7, 18, 2, 5, 4).unwrap();
        let dt = zip_datetime(at).unwrap();
        assert_eq!(dt.year(), 2015);
        assert_eq!(dt.month(), 7);
        assert_eq!(dt.day(), 18);
        assert_eq!(dt.hour(), 2);
        assert_eq!(dt.minute(), 5);
        // DOS time has two second resolution
        assert_eq!(dt.second(), 4);
    }

    #[test]
    fn test_zip_datetime_out_of_range() {
        let at = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert!(zip_datetime(at).is_none());
    }
}
