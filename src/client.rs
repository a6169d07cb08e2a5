//! Seam to the external comic download library
//!
//! The library is a black box: given an identifier and network options it
//! writes one album folder under `base_dir` (name not under our control) or
//! fails with an error message. Calls are blocking and run on the worker pool.

use crate::error::FailureKind;
use crate::types::ComicId;
use std::path::PathBuf;
use thiserror::Error;

/// Everything the library needs for one download attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Domain to download from
    pub domain: String,
    /// Directory the album folder is written into
    pub base_dir: PathBuf,
    /// Folder naming rule, passed through verbatim
    pub dir_rule: String,
    /// Optional proxy URL
    pub proxy: Option<String>,
    /// Optional session cookie
    pub cookie: Option<String>,
    /// Image download threads inside the library
    pub image_threads: usize,
}

impl FetchRequest {
    /// Same request aimed at another domain
    pub fn with_domain(&self, domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..self.clone()
        }
    }
}

/// Failure reported by the download library
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    /// The library's error text
    pub message: String,
}

impl ClientError {
    /// Wrap an error message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Best-effort classification of the message
    pub fn kind(&self) -> FailureKind {
        FailureKind::classify(&self.message)
    }
}

/// Blocking interface of the external download library
///
/// # Examples
///
/// ```
/// use comic_dl::client::{ClientError, ComicClient, FetchRequest};
/// use comic_dl::types::ComicId;
///
/// struct MirrorClient;
///
/// impl ComicClient for MirrorClient {
///     fn download_album(&self, id: &ComicId, request: &FetchRequest) -> Result<(), ClientError> {
///         let folder = request.base_dir.join(format!("{id}_Mirrored"));
///         std::fs::create_dir_all(&folder).map_err(|e| ClientError::new(e.to_string()))?;
///         std::fs::write(folder.join("00001.jpg"), b"page").map_err(|e| ClientError::new(e.to_string()))
///     }
/// }
/// ```
pub trait ComicClient: Send + Sync {
    /// Download every image of album `id`, writing one folder under `request.base_dir`
    fn download_album(
        &self,
        id: &ComicId,
        request: &FetchRequest,
    ) -> std::result::Result<(), ClientError>;
}
