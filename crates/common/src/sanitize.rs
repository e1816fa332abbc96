//! Archive entry name sanitizing and path layout.
//!
//! Names coming out of a manifest are untrusted. Every character that is
//! unsafe in a zip entry name (or a download file name) is stripped; nothing
//! is escaped or replaced.

use crate::manifest::ManifestEntry;

/// Characters removed from untrusted names.
pub const RESERVED: [char; 10] = ['#', '<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback for an entry whose display name sanitizes to nothing.
pub const FILE_FALLBACK: &str = "file";
/// Fallback for a group whose name sanitizes to nothing.
pub const GROUP_FALLBACK: &str = "Project";
/// Fallback for the archive download name.
pub const ARCHIVE_NAME_FALLBACK: &str = "download.zip";

/// Strip every reserved character from `raw`.
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| !RESERVED.contains(c)).collect()
}

/// Like [`sanitize`], substituting `fallback` when nothing is left.
pub fn sanitize_or(raw: &str, fallback: &str) -> String {
    let clean = sanitize(raw);
    if clean.is_empty() {
        fallback.to_string()
    } else {
        clean
    }
}

/// Compose the name an entry is stored under inside the archive.
///
/// Layout: `[<group_id>.<group_name>/][<folder>/][<entry_id>.]<display_name>`.
/// The folder is a caller-trusted virtual path and is taken verbatim.
pub fn archive_path(entry: &ManifestEntry) -> String {
    let mut path = String::new();

    if entry.group_id > 0 {
        path.push_str(&entry.group_id.to_string());
        path.push('.');
        path.push_str(&sanitize_or(&entry.group_name, GROUP_FALLBACK));
        path.push('/');
    }

    if !entry.folder_path.is_empty() {
        path.push_str(&entry.folder_path);
        if !path.ends_with('/') {
            path.push('/');
        }
    }

    if entry.entry_id > 0 {
        path.push_str(&entry.entry_id.to_string());
        path.push('.');
    }

    path.push_str(&sanitize_or(&entry.display_name, FILE_FALLBACK));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(display_name: &str) -> ManifestEntry {
        ManifestEntry {
            source_key: "bucket/key".to_string(),
            display_name: display_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sanitize_strips_reserved() {
        assert_eq!(sanitize("a#b<c>d:e\"f/g\\h|i?j*k"), "abcdefghijk");
        assert_eq!(sanitize("plain name.txt"), "plain name.txt");
        assert_eq!(sanitize("ünïcödé: ファイル.pdf"), "ünïcödé ファイル.pdf");
    }

    #[test]
    fn test_sanitize_never_leaves_reserved() {
        let inputs = [
            "",
            "////",
            "..\\..\\windows\\system32",
            "what?*|<>\"#:",
            "mixed/and:normal",
        ];
        for input in inputs {
            let out = sanitize(input);
            assert!(
                !out.chars().any(|c| RESERVED.contains(&c)),
                "{input:?} -> {out:?}"
            );
        }
    }

    #[test]
    fn test_sanitize_idempotent() {
        for input in ["a:b", "::", "x/y/z", "clean", "", "?#?"] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_sanitize_or_fallback() {
        assert_eq!(sanitize_or("", FILE_FALLBACK), "file");
        assert_eq!(sanitize_or("///", GROUP_FALLBACK), "Project");
        assert_eq!(sanitize_or(":", ARCHIVE_NAME_FALLBACK), "download.zip");
        assert_eq!(sanitize_or("a:b", FILE_FALLBACK), "ab");
    }

    #[test]
    fn test_path_with_group_and_folder() {
        let mut e = entry("a1.jpg");
        e.group_id = 23216;
        e.group_name = "Superman".to_string();
        e.folder_path = "Level 1/Level 2 x/Level 3".to_string();
        assert_eq!(
            archive_path(&e),
            "23216.Superman/Level 1/Level 2 x/Level 3/a1.jpg"
        );
    }

    #[test]
    fn test_path_bare_display_name() {
        let e = entry("Avis Rent A Car: Print Reservation.pdf");
        assert_eq!(archive_path(&e), "Avis Rent A Car Print Reservation.pdf");
    }

    #[test]
    fn test_path_group_name_fallback() {
        let mut e = entry("report.pdf");
        e.group_id = 7;
        e.group_name = "::".to_string();
        assert_eq!(archive_path(&e), "7.Project/report.pdf");
    }

    #[test]
    fn test_path_non_positive_group_ignored() {
        let mut e = entry("report.pdf");
        e.group_id = -3;
        e.group_name = "Ignored".to_string();
        assert_eq!(archive_path(&e), "report.pdf");
    }

    #[test]
    fn test_path_folder_trailing_slash_kept_single() {
        let mut e = entry("b.txt");
        e.folder_path = "docs/".to_string();
        assert_eq!(archive_path(&e), "docs/b.txt");
    }

    #[test]
    fn test_path_folder_is_verbatim() {
        let mut e = entry("b.txt");
        e.folder_path = "we:ird?/dir".to_string();
        assert_eq!(archive_path(&e), "we:ird?/dir/b.txt");
    }

    #[test]
    fn test_path_entry_id_prefix() {
        let mut e = entry("notes.txt");
        e.group_id = 1;
        e.group_name = "Alpha".to_string();
        e.folder_path = "x".to_string();
        e.entry_id = 4169;
        assert_eq!(archive_path(&e), "1.Alpha/x/4169.notes.txt");
    }

    #[test]
    fn test_path_empty_display_name() {
        let e = entry("?*");
        assert_eq!(archive_path(&e), "file");
    }
}
