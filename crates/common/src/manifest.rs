//! Manifest model.
//!
//! A manifest is the ordered list of files a reference token stands for. It is
//! written by an external producer as a JSON array and only ever read here.
//! Entry order is archive order.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

/// Layout of the producer's `Modified` timestamps, e.g. `2015-07-18T02:05:04Z`.
pub const MODIFIED_LAYOUT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("malformed manifest payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One file destined for one archive entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Object store key. Entries without one are skipped.
    pub source_key: String,
    /// Untrusted file name.
    pub display_name: String,
    /// Virtual directory prefix, taken verbatim.
    pub folder_path: String,
    /// Parent group; `<= 0` means no group.
    pub group_id: i64,
    /// Untrusted group name, only used when `group_id > 0`.
    pub group_name: String,
    /// Disambiguation prefix; `<= 0` means none.
    pub entry_id: i64,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parse the producer's JSON payload.
    ///
    /// A structurally invalid payload is an error. A bad timestamp on a single
    /// entry is not: it is logged and that entry's timestamp is dropped.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ManifestError> {
        let records: Option<Vec<ManifestRecord>> = serde_json::from_slice(payload)?;
        let entries = records
            .unwrap_or_default()
            .into_iter()
            .map(ManifestEntry::from)
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parse a producer timestamp. Empty input is simply absent.
pub fn parse_modified(raw: &str) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let naive = NaiveDateTime::parse_from_str(raw, MODIFIED_LAYOUT)?;
    Ok(Some(naive.and_utc()))
}

// Wire shape of one manifest element. The producer's key casing is not
// consistent (`Modified` vs `modified`), and ids arrive either as JSON
// numbers or as quoted strings.
#[serde_as]
#[derive(Debug, Deserialize)]
struct ManifestRecord {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "S3Path", alias = "s3Path", alias = "s3path", default)]
    s3_path: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "FileName", alias = "fileName", alias = "filename", default)]
    file_name: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Folder", alias = "folder", default)]
    folder: String,

    #[serde_as(as = "DefaultOnNull<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(rename = "FileId", alias = "fileId", alias = "fileid", default)]
    file_id: i64,

    #[serde_as(as = "DefaultOnNull<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(rename = "ProjectId", alias = "projectId", alias = "projectid", default)]
    project_id: i64,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "ProjectName", alias = "projectName", alias = "projectname", default)]
    project_name: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "Modified", alias = "modified", default)]
    modified: String,
}

impl From<ManifestRecord> for ManifestEntry {
    fn from(record: ManifestRecord) -> Self {
        let modified_at = match parse_modified(&record.modified) {
            Ok(modified_at) => modified_at,
            Err(e) => {
                tracing::warn!(
                    date = %record.modified,
                    file = %record.file_name,
                    error = %e,
                    "unparsable modified date, omitting timestamp"
                );
                None
            }
        };

        Self {
            source_key: record.s3_path,
            display_name: record.file_name,
            folder_path: record.folder,
            group_id: record.project_id,
            group_name: record.project_name,
            entry_id: record.file_id,
            modified_at,
        }
    }
}
