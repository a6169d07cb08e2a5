//! On-disk layout and quota eviction
//!
//! Everything the downloader owns lives under one data directory:
//!
//! ```text
//! <data_dir>/
//!   downloads/   external library writes one folder per album here
//!   archives/    <id>.7z, one per packaged comic (idempotency key)
//!   covers/      cover images, only touched by eviction
//! ```

use crate::error::Result;
use crate::types::ComicId;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directory layout under the configured data directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    /// Root data directory
    pub root: PathBuf,
    /// Where the external library writes album folders
    pub download_dir: PathBuf,
    /// Where packaged archives are kept
    pub archive_dir: PathBuf,
    /// Where cover images are kept
    pub cover_dir: PathBuf,
}

impl StorageLayout {
    /// Build the layout for a data directory (nothing is created yet)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            download_dir: root.join("downloads"),
            archive_dir: root.join("archives"),
            cover_dir: root.join("covers"),
            root,
        }
    }

    /// Create every directory that does not exist yet
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.root,
            &self.download_dir,
            &self.archive_dir,
            &self.cover_dir,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }
        debug!(root = ?self.root, "storage directories ready");
        Ok(())
    }

    /// Path of the archive for an identifier
    pub fn archive_path(&self, id: &ComicId, extension: &str) -> PathBuf {
        self.archive_dir.join(format!("{id}.{extension}"))
    }

    /// Directories subject to quota eviction
    pub fn evictable_dirs(&self) -> [&Path; 2] {
        [self.archive_dir.as_path(), self.cover_dir.as_path()]
    }
}

/// A regular file found while scanning storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    /// File path
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// Outcome of one eviction pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Bytes used before the pass
    pub total_before: u64,
    /// Bytes used after the pass
    pub total_after: u64,
    /// Files that were deleted
    pub evicted: Vec<StoredFile>,
}

/// Recursively list regular files under the given directories
///
/// Missing directories are skipped. Entries that vanish during the walk are ignored.
pub fn scan_files(dirs: &[&Path]) -> std::io::Result<Vec<StoredFile>> {
    let mut files = Vec::new();

    for dir in dirs {
        if !dir.exists() {
            continue;
        }
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::NotFound) => {
                    continue;
                }
                Err(e) => return Err(std::io::Error::other(e)),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            files.push(StoredFile {
                path: entry.into_path(),
                size_bytes: metadata.len(),
                modified,
            });
        }
    }

    Ok(files)
}

/// Delete old files until the directories fit in `quota_bytes`
///
/// Nothing happens while the total is within quota. Otherwise files older than
/// `max_age` (relative to `now`) are deleted oldest first until the total fits.
/// Younger files are never deleted, so the result may still exceed the quota.
/// Individual delete failures are logged and skipped.
pub fn evict_stale(
    dirs: &[&Path],
    quota_bytes: u64,
    max_age: Duration,
    now: DateTime<Utc>,
) -> std::io::Result<EvictionReport> {
    let mut files = scan_files(dirs)?;
    let total_before: u64 = files.iter().map(|f| f.size_bytes).sum();

    let mut report = EvictionReport {
        total_before,
        total_after: total_before,
        evicted: Vec::new(),
    };

    if total_before <= quota_bytes {
        return Ok(report);
    }

    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
    files.retain(|f| now.signed_duration_since(f.modified) > max_age);
    files.sort_by_key(|f| f.modified);

    for file in files {
        if report.total_after <= quota_bytes {
            break;
        }
        match std::fs::remove_file(&file.path) {
            Ok(()) => {
                report.total_after = report.total_after.saturating_sub(file.size_bytes);
                debug!(path = ?file.path, size = file.size_bytes, "evicted stale file");
                report.evicted.push(file);
            }
            Err(e) => {
                warn!(path = ?file.path, error = %e, "failed to evict file");
            }
        }
    }

    if report.total_after > quota_bytes {
        warn!(
            total = report.total_after,
            quota = quota_bytes,
            "storage still over quota, remaining files are too recent to evict"
        );
    } else {
        info!(
            evicted = report.evicted.len(),
            freed = report.total_before - report.total_after,
            "storage quota restored"
        );
    }

    Ok(report)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; len]).unwrap();
    }

    #[tokio::test]
    async fn test_ensure_dirs_creates_layout() {
        let temp = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(temp.path().join("data"));
        layout.ensure_dirs().await.unwrap();

        assert!(layout.download_dir.is_dir());
        assert!(layout.archive_dir.is_dir());
        assert!(layout.cover_dir.is_dir());

        // Second call is a no-op
        layout.ensure_dirs().await.unwrap();
    }

    #[test]
    fn test_archive_path_uses_id_and_extension() {
        let layout = StorageLayout::new("/data");
        let id = ComicId::parse("42").unwrap();
        assert_eq!(
            layout.archive_path(&id, "7z"),
            PathBuf::from("/data/archives/42.7z")
        );
    }

    #[test]
    fn test_scan_skips_missing_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let present = temp.path().join("present");
        write_file(&present.join("a.bin"), 10);
        write_file(&present.join("nested").join("b.bin"), 5);

        let missing = temp.path().join("missing");
        let files = scan_files(&[&present, &missing]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files.iter().map(|f| f.size_bytes).sum::<u64>(), 15);
    }

    #[test]
    fn test_evict_noop_under_quota() {
        let temp = tempfile::tempdir().unwrap();
        write_file(&temp.path().join("a.7z"), 100);

        let future = Utc::now() + chrono::Duration::days(365);
        let report = evict_stale(&[temp.path()], 1000, Duration::ZERO, future).unwrap();
        assert!(report.evicted.is_empty());
        assert!(temp.path().join("a.7z").exists());
    }

    #[test]
    fn test_evict_only_old_files_until_under_quota() {
        let temp = tempfile::tempdir().unwrap();
        write_file(&temp.path().join("a.7z"), 100);
        write_file(&temp.path().join("b.7z"), 100);
        write_file(&temp.path().join("c.7z"), 100);

        // Everything was written "just now", so from a point 10 days later all
        // files are older than the 7 day limit
        let later = Utc::now() + chrono::Duration::days(10);
        let report = evict_stale(
            &[temp.path()],
            150,
            Duration::from_secs(7 * 24 * 3600),
            later,
        )
        .unwrap();

        assert_eq!(report.total_before, 300);
        assert_eq!(report.evicted.len(), 2);
        assert_eq!(report.total_after, 100);
    }

    #[test]
    fn test_evict_keeps_recent_files_even_over_quota() {
        let temp = tempfile::tempdir().unwrap();
        write_file(&temp.path().join("fresh.7z"), 500);

        let report = evict_stale(
            &[temp.path()],
            10,
            Duration::from_secs(7 * 24 * 3600),
            Utc::now(),
        )
        .unwrap();

        assert!(report.evicted.is_empty());
        assert_eq!(report.total_after, 500);
        assert!(temp.path().join("fresh.7z").exists());
    }
}
