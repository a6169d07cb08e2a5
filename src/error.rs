//! Error types for comic-dl
//!
//! This module provides the error taxonomy for one comic request:
//! - Validation and in-flight rejection (no side effects performed)
//! - Download failures with a best-effort classification of the library's error text
//! - Resolution misses (download reported success but no folder matched)
//! - Packaging failures (the source folder is always left in place)
//!
//! Every error is local to one request; none of them is fatal to the process.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for comic-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for comic-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "domain_list")
        key: Option<String>,
    },

    /// Comic identifier failed format or length checks
    #[error("invalid comic id {id:?}: {reason}")]
    InvalidId {
        /// The rejected identifier, as received
        id: String,
        /// Why it was rejected
        reason: String,
    },

    /// A request for the same identifier is already being downloaded or packaged
    #[error("comic {0} is already being downloaded")]
    AlreadyInFlight(String),

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// The download reported success but no folder matched the identifier
    #[error("no downloaded folder found for comic {id} under {base_dir}")]
    ResolutionMiss {
        /// The comic identifier that could not be resolved
        id: String,
        /// The directory that was searched
        base_dir: PathBuf,
    },

    /// Packaging error (compression or verification)
    #[error("packaging error: {0}")]
    Package(#[from] PackageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new requests
    #[error("shutdown in progress: not accepting new requests")]
    ShuttingDown,

    /// Insufficient disk space
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the operation
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },

    /// Failed to check disk space
    #[error("failed to check disk space: {0}")]
    DiskSpaceCheckFailed(String),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The external library failed on the primary domain and every alternate tried
    #[error("download of comic {id} failed via {domain} ({kind}): {message}")]
    Failed {
        /// The comic identifier
        id: String,
        /// The primary domain whose error is reported
        domain: String,
        /// Best-effort classification of the failure
        kind: FailureKind,
        /// The library's error text
        message: String,
        /// Number of domains attempted in total
        attempts: usize,
    },

    /// No domain is configured to download from
    #[error("no download domain configured")]
    NoDomains,

    /// The download did not return before the configured deadline
    #[error("download of comic {id} timed out after {}s", after.as_secs())]
    TimedOut {
        /// The comic identifier
        id: String,
        /// The deadline that elapsed
        after: Duration,
    },

    /// The worker thread running a blocking job panicked or was cancelled
    #[error("worker task failed: {reason}")]
    WorkerFailed {
        /// Description of the join failure
        reason: String,
    },
}

/// Packaging errors (compression, verification)
///
/// Whenever one of these is returned, the source folder has not been deleted.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The folder to package does not exist or is not a directory
    #[error("source folder {folder} does not exist")]
    MissingSource {
        /// The folder that was expected
        folder: PathBuf,
    },

    /// The archive tool failed
    #[error("failed to compress {folder} into {archive}: {reason}")]
    CompressionFailed {
        /// The folder being compressed
        folder: PathBuf,
        /// The archive being written
        archive: PathBuf,
        /// The reason compression failed
        reason: String,
    },

    /// The archive tool reported success but produced nothing usable
    #[error("archive {archive} is missing or empty after compression")]
    EmptyArchive {
        /// The archive that failed verification
        archive: PathBuf,
    },

    /// Invalid path or archive root name
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The invalid path that was encountered
        path: PathBuf,
        /// The reason the path is invalid
        reason: String,
    },
}

/// Best-effort classification of an external download failure
///
/// Derived from the error text of the scraping library, so it can only be a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request or read timed out
    Timeout,
    /// DNS, refused or reset connections, proxy trouble
    Connectivity,
    /// The site answered but its pages could not be parsed
    SiteChanged,
    /// Local permission problem while writing files
    Permission,
    /// Local disk full
    DiskSpace,
    /// Anything else
    Unknown,
}

impl FailureKind {
    /// Classify a failure from the library's error text
    pub fn classify(message: &str) -> Self {
        let text = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if has(&["no space", "disk full", "not enough space", "quota exceeded"]) {
            FailureKind::DiskSpace
        } else if has(&["permission", "access denied", "access is denied", "read-only"]) {
            FailureKind::Permission
        } else if has(&["timeout", "timed out"]) {
            FailureKind::Timeout
        } else if has(&[
            "connection",
            "connect",
            "dns",
            "resolve",
            "unreachable",
            "proxy",
            "ssl",
            "network",
        ]) {
            FailureKind::Connectivity
        } else if has(&["parse", "regex", "selector", "structure", "no match", "not found"]) {
            FailureKind::SiteChanged
        } else {
            FailureKind::Unknown
        }
    }

    /// Short advice shown to the requesting user
    pub fn hint(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "the site took too long to answer, try again later",
            FailureKind::Connectivity => "could not reach the site, check the proxy or domains",
            FailureKind::SiteChanged => {
                "the site layout may have changed or the comic does not exist"
            }
            FailureKind::Permission => "the download directory is not writable",
            FailureKind::DiskSpace => "the disk is full",
            FailureKind::Unknown => "unknown error, see the logs",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connectivity => "connectivity",
            FailureKind::SiteChanged => "site changed",
            FailureKind::Permission => "permission",
            FailureKind::DiskSpace => "disk space",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidId { .. } => "validation_error",
            Error::AlreadyInFlight(_) => "already_in_flight",
            Error::Download(e) => match e {
                DownloadError::Failed { .. } => "download_failed",
                DownloadError::NoDomains => "no_domains",
                DownloadError::TimedOut { .. } => "download_timed_out",
                DownloadError::WorkerFailed { .. } => "worker_failed",
            },
            Error::ResolutionMiss { .. } => "resolution_miss",
            Error::Package(e) => match e {
                PackageError::MissingSource { .. } => "missing_source",
                PackageError::CompressionFailed { .. } => "compression_failed",
                PackageError::EmptyArchive { .. } => "empty_archive",
                PackageError::InvalidPath { .. } => "invalid_path",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ShuttingDown => "shutting_down",
            Error::InsufficientSpace { .. } => "insufficient_space",
            Error::DiskSpaceCheckFailed(_) => "disk_space_check_failed",
        }
    }

    /// Message suitable for sending back to the requesting chat user
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidId { id, reason } => {
                format!("Invalid comic id {id:?}: {reason}. Ids are digits only.")
            }
            Error::AlreadyInFlight(id) => {
                format!("Comic {id} is already being downloaded, please wait.")
            }
            Error::Download(DownloadError::Failed {
                id, kind, message, ..
            }) => format!(
                "Download of comic {id} failed ({kind}): {}. Details: {message}",
                kind.hint()
            ),
            Error::Download(DownloadError::TimedOut { id, after }) => format!(
                "Download of comic {id} did not finish within {}.",
                describe_duration(*after)
            ),
            Error::ResolutionMiss { id, .. } => format!(
                "Comic {id} was downloaded but its folder could not be found. \
                 The folder naming rule may have changed."
            ),
            Error::Package(e) => {
                format!("Packaging failed, the downloaded files were kept: {e}")
            }
            Error::ShuttingDown => "The downloader is shutting down, try again later.".to_string(),
            Error::InsufficientSpace { .. } => {
                "Not enough free disk space to start a new download.".to_string()
            }
            other => format!("Request failed: {other}"),
        }
    }
}

/// Whole minutes when the duration is a multiple of one, seconds otherwise
fn describe_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0 => format!("{} ms", duration.as_millis()),
        60 => "1 minute".to_string(),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{s} seconds"),
    }
}
