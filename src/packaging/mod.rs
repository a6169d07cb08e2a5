//! Packaging downloaded folders into encrypted archives
//!
//! This module turns a resolved album folder into a single archive and then
//! removes the folder. The ordering is the whole point:
//!
//! 1. Compress into `<archive>.partial`
//! 2. Verify the staging file is non-empty, move it into place, verify again
//! 3. Only then delete the source folder
//!
//! Any failure before step 3 leaves the source folder untouched, so the only
//! copy of downloaded data is never destroyed before its replacement exists.
//!
//! The compression engine is pluggable through [`ArchiveBackend`];
//! [`SevenZipBackend`] is the production implementation.

mod sevenz;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use sevenz::SevenZipBackend;

use crate::error::{PackageError, Result};
use crate::types::ComicId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Suffix of the staging file written before the archive is moved into place
const STAGING_SUFFIX: &str = "partial";

/// Compression engine used by the [`Packager`]
///
/// Implementations are called from a blocking worker thread.
pub trait ArchiveBackend: Send + Sync {
    /// File extension of produced archives, without the dot
    fn extension(&self) -> &'static str;

    /// Compress `source` recursively into `dest`
    ///
    /// The archived root directory must be named `inner_name`. When `password`
    /// is `Some`, both contents and file names must require it.
    fn compress(
        &self,
        source: &Path,
        dest: &Path,
        inner_name: &str,
        password: Option<&str>,
    ) -> Result<()>;

    /// Whether `archive` is protected by exactly `password`
    ///
    /// `None` asks whether it opens without any password. `Some` asks whether
    /// it refuses to open without one and opens with this one.
    fn opens_with(&self, archive: &Path, password: Option<&str>) -> bool;
}

/// Result of a successful packaging run
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageOutcome {
    /// Archive path
    pub archive: PathBuf,
    /// Archive size in bytes (always > 0)
    pub size_bytes: u64,
    /// Whether the source folder was deleted
    ///
    /// False only when deletion itself failed after the archive was verified;
    /// the folder is then left for manual cleanup.
    pub source_removed: bool,
}

/// Derive the archive password for an identifier
///
/// A non-empty custom password always wins. Otherwise the password is
/// `prefix + id`, which any recipient who knows the id can compute. It keeps
/// platform content scanners out of the archive; it is not a secret.
///
/// # Examples
///
/// ```
/// use comic_dl::packaging::derive_password;
/// use comic_dl::types::ComicId;
///
/// let id = ComicId::parse("999").unwrap();
/// assert_eq!(derive_password("", "jm", &id), "jm999");
/// assert_eq!(derive_password("secret", "jm", &id), "secret");
/// ```
#[must_use]
pub fn derive_password(custom: &str, prefix: &str, id: &ComicId) -> String {
    if custom.is_empty() {
        format!("{prefix}{id}")
    } else {
        custom.to_string()
    }
}

/// Size of a valid archive at `path`
///
/// An archive is valid only if it exists, is a regular file, and is non-empty.
pub fn archive_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file() && m.len() > 0)
        .map(|m| m.len())
}

/// Compresses folders into archives and removes the sources afterwards
#[derive(Clone)]
pub struct Packager {
    backend: Arc<dyn ArchiveBackend>,
}

impl Packager {
    /// Create a packager over a compression backend
    pub fn new(backend: Arc<dyn ArchiveBackend>) -> Self {
        Self { backend }
    }

    /// Create a packager using 7z with the given LZMA2 preset (0-9)
    pub fn sevenz(level: u32) -> Self {
        Self::new(Arc::new(SevenZipBackend::new(level)))
    }

    /// Extension of produced archives
    pub fn extension(&self) -> &'static str {
        self.backend.extension()
    }

    /// Whether a valid archive at `archive_path` opens with exactly `password`
    ///
    /// Blocking. An empty password counts as none, as in [`package`](Self::package).
    pub fn opens_with(&self, archive_path: &Path, password: Option<&str>) -> bool {
        archive_size(archive_path).is_some()
            && self
                .backend
                .opens_with(archive_path, password.filter(|p| !p.is_empty()))
    }

    /// Archive `folder` into `archive_path`, then delete `folder`
    ///
    /// Blocking; call it from a worker thread. An existing archive at
    /// `archive_path` is replaced only once the new one is verified.
    ///
    /// # Errors
    ///
    /// Every error leaves `folder` in place:
    /// - [`PackageError::MissingSource`] if `folder` is not a directory
    /// - [`PackageError::InvalidPath`] if `inner_name` is not a single path component
    /// - [`PackageError::CompressionFailed`] if the backend fails
    /// - [`PackageError::EmptyArchive`] if the result is missing or zero bytes
    pub fn package(
        &self,
        folder: &Path,
        archive_path: &Path,
        password: Option<&str>,
        inner_name: &str,
    ) -> Result<PackageOutcome> {
        if !folder.is_dir() {
            return Err(PackageError::MissingSource {
                folder: folder.to_path_buf(),
            }
            .into());
        }
        validate_inner_name(inner_name, folder)?;

        let password = password.filter(|p| !p.is_empty());
        let staging = staging_path(archive_path);

        if let Some(parent) = archive_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        remove_if_present(&staging);

        debug!(
            ?folder,
            ?archive_path,
            inner_name,
            encrypted = password.is_some(),
            "compressing folder"
        );

        if let Err(e) = self
            .backend
            .compress(folder, &staging, inner_name, password)
        {
            remove_if_present(&staging);
            warn!(?folder, error = %e, "compression failed, keeping source folder");
            return Err(e);
        }

        if archive_size(&staging).is_none() {
            remove_if_present(&staging);
            return Err(PackageError::EmptyArchive {
                archive: staging,
            }
            .into());
        }

        std::fs::rename(&staging, archive_path).inspect_err(|_| remove_if_present(&staging))?;

        let Some(size_bytes) = archive_size(archive_path) else {
            return Err(PackageError::EmptyArchive {
                archive: archive_path.to_path_buf(),
            }
            .into());
        };

        let source_removed = match std::fs::remove_dir_all(folder) {
            Ok(()) => true,
            Err(e) => {
                warn!(?folder, error = %e, "archive verified but source folder could not be removed");
                false
            }
        };

        info!(
            ?archive_path,
            size_bytes,
            source_removed,
            "folder packaged"
        );

        Ok(PackageOutcome {
            archive: archive_path.to_path_buf(),
            size_bytes,
            source_removed,
        })
    }
}

fn staging_path(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_os_string();
    name.push(".");
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(?path, error = %e, "failed to remove staging file");
    }
}

fn validate_inner_name(inner_name: &str, folder: &Path) -> Result<()> {
    let bad = inner_name.is_empty()
        || inner_name == "."
        || inner_name == ".."
        || inner_name.contains(['/', '\\', '\0']);
    if bad {
        return Err(PackageError::InvalidPath {
            path: folder.to_path_buf(),
            reason: format!("archive root name {inner_name:?} is not a single path component"),
        }
        .into());
    }
    Ok(())
}
