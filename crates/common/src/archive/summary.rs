use crate::fetcher::FetchError;

/// Why an entry did not make it into the archive intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The manifest entry has no source key
    MissingSourceKey,
    /// The object store has nothing under the key
    NotFound,
    /// The object store failed in a way that might not repeat
    Transient(String),
    /// The object store failed for any other reason
    FetchFailed(String),
    /// The archive refused the entry header
    Rejected(String),
    /// Reading the object failed part way. The entry is present in the
    /// archive but holds only the bytes read before the failure.
    Truncated(String),
}

impl From<&FetchError> for SkipReason {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::NotFound(_) => SkipReason::NotFound,
            FetchError::Transient { reason, .. } => SkipReason::Transient(reason.clone()),
            FetchError::Other { reason, .. } => SkipReason::FetchFailed(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Included { bytes: u64 },
    Skipped(SkipReason),
}

/// Result for one manifest entry, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// Position in the manifest
    pub index: usize,
    /// Name inside the archive, if one was computed
    pub zip_path: Option<String>,
    pub outcome: EntryOutcome,
}

/// Ordered per-entry accounting for one build. Kept server side only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    reports: Vec<EntryReport>,
}

impl ArchiveSummary {
    pub(crate) fn include(&mut self, index: usize, zip_path: String, bytes: u64) {
        self.reports.push(EntryReport {
            index,
            zip_path: Some(zip_path),
            outcome: EntryOutcome::Included { bytes },
        });
    }

    pub(crate) fn skip(&mut self, index: usize, zip_path: Option<String>, reason: SkipReason) {
        self.reports.push(EntryReport {
            index,
            zip_path,
            outcome: EntryOutcome::Skipped(reason),
        });
    }

    pub fn reports(&self) -> &[EntryReport] {
        &self.reports
    }

    pub fn included(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Included { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.reports.len() - self.included()
    }

    /// Uncompressed bytes copied into the archive.
    pub fn bytes(&self) -> u64 {
        self.reports
            .iter()
            .map(|r| match r.outcome {
                EntryOutcome::Included { bytes } => bytes,
                EntryOutcome::Skipped(_) => 0,
            })
            .sum()
    }
}
