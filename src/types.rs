//! Core types for comic-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest identifier accepted by [`validate_comic_id`]
pub const MAX_COMIC_ID_LEN: usize = 20;

/// Check that a raw identifier is safe to use as a path fragment and library argument
///
/// Accepts 1 to [`MAX_COMIC_ID_LEN`] ASCII digits and nothing else, so separators,
/// dots and shell metacharacters can never reach a path or the archive tool.
///
/// # Examples
///
/// ```
/// use comic_dl::types::validate_comic_id;
///
/// assert!(validate_comic_id("422866"));
/// assert!(!validate_comic_id(""));
/// assert!(!validate_comic_id("../etc"));
/// assert!(!validate_comic_id("12a"));
/// ```
#[must_use]
pub fn validate_comic_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_COMIC_ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
}

/// Validated comic identifier
///
/// Can only be built through [`ComicId::parse`], so holding one means the
/// identifier has passed [`validate_comic_id`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ComicId(String);

impl ComicId {
    /// Trim surrounding whitespace and validate a raw identifier
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(invalid(raw, "identifier is empty"));
        }
        if trimmed.len() > MAX_COMIC_ID_LEN {
            return Err(invalid(
                raw,
                &format!("identifier is longer than {MAX_COMIC_ID_LEN} characters"),
            ));
        }
        if !validate_comic_id(trimmed) {
            return Err(invalid(raw, "identifier may only contain digits"));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid(raw: &str, reason: &str) -> Error {
    Error::InvalidId {
        id: raw.to_string(),
        reason: reason.to_string(),
    }
}

impl AsRef<str> for ComicId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ComicId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for ComicId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ComicId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A packaged archive ready for delivery
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHandle {
    /// Comic identifier
    pub id: ComicId,
    /// Absolute or data-dir relative path of the archive
    pub path: PathBuf,
    /// File name shown to the recipient
    pub display_name: String,
    /// Archive size in bytes (always > 0)
    pub size_bytes: u64,
    /// True when an existing archive was reused instead of downloading
    pub reused: bool,
    /// True when the archive password is the user-configured one
    pub custom_password: bool,
}

/// Event emitted during a request's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Request accepted and identifier marked in flight
    Accepted {
        /// Comic identifier
        id: ComicId,
    },

    /// A valid archive already existed and was reused
    Reused {
        /// Comic identifier
        id: ComicId,
        /// Archive path
        archive: PathBuf,
    },

    /// Download attempt started against a domain
    Downloading {
        /// Comic identifier
        id: ComicId,
        /// Domain being tried
        domain: String,
    },

    /// Download attempt against one domain failed
    DomainFailed {
        /// Comic identifier
        id: ComicId,
        /// Domain that failed
        domain: String,
        /// Library error text
        error: String,
    },

    /// Download finished
    Downloaded {
        /// Comic identifier
        id: ComicId,
        /// Domain that succeeded
        domain: String,
    },

    /// Downloaded folder located
    Resolved {
        /// Comic identifier
        id: ComicId,
        /// Folder that will be packaged
        folder: PathBuf,
    },

    /// Packaging started
    Packaging {
        /// Comic identifier
        id: ComicId,
    },

    /// Archive written and verified
    Packaged {
        /// Comic identifier
        id: ComicId,
        /// Archive path
        archive: PathBuf,
        /// Archive size in bytes
        size_bytes: u64,
    },

    /// Request failed
    Failed {
        /// Comic identifier
        id: ComicId,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
    },

    /// A stored file was evicted to stay under the storage quota
    Evicted {
        /// Evicted file
        path: PathBuf,
        /// Its size in bytes
        size_bytes: u64,
    },

    /// Downloader is shutting down
    Shutdown,
}
