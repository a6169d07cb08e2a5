//! # comic-dl
//!
//! Download pipeline for a chat-bot comic plugin: a user sends a numeric comic
//! id, an external scraping library downloads the album, and comic-dl turns the
//! result into one password-protected archive to send back.
//!
//! The hard part is what happens after the download: the library names album
//! folders inconsistently, so [`resolver`] locates the folder with ordered match
//! rules; [`packaging`] archives it and deletes it only once the archive is
//! verified; [`downloader`] makes sure an identifier is processed by at most one
//! request at a time, with backup domains and a deadline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use comic_dl::client::{ClientError, ComicClient, FetchRequest};
//! use comic_dl::messenger::NoOpMessenger;
//! use comic_dl::types::ComicId;
//! use comic_dl::{ComicDownloader, Config};
//! use std::sync::Arc;
//!
//! struct ScraperBinding;
//!
//! impl ComicClient for ScraperBinding {
//!     fn download_album(&self, id: &ComicId, request: &FetchRequest) -> Result<(), ClientError> {
//!         // Call into the scraping library here
//!         let _ = (id, request);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("comic_dl.json".as_ref());
//!     let downloader = ComicDownloader::new(config, Arc::new(ScraperBinding)).await?;
//!
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader.handle_request("422866", &NoOpMessenger).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// External download library seam
pub mod client;
/// Configuration types
pub mod config;
/// Download coordinator (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Delivery to the chat platform
pub mod messenger;
/// Folder to archive packaging
pub mod packaging;
/// Downloaded folder lookup
pub mod resolver;
/// Backup domain fallback
pub mod retry;
/// Data directory layout and quota eviction
pub mod storage;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use client::{ClientError, ComicClient, FetchRequest};
pub use config::{Config, RuntimeSettings};
pub use downloader::{ComicDownloader, InFlightGuard, InFlightSet, WorkerPool};
pub use error::{DownloadError, Error, FailureKind, PackageError, Result};
pub use messenger::{Messenger, NoOpMessenger};
pub use packaging::{ArchiveBackend, PackageOutcome, Packager, SevenZipBackend};
pub use resolver::{FolderResolver, MatchTier};
pub use types::{ArchiveHandle, ComicId, Event, validate_comic_id};

/// Run the downloader until a termination signal arrives, then shut it down.
///
/// - **Unix:** SIGTERM or SIGINT
/// - **Other platforms:** Ctrl+C via `tokio::signal::ctrl_c()`
///
/// # Example
///
/// ```no_run
/// use comic_dl::{ComicDownloader, Config, run_with_shutdown};
/// # use comic_dl::{ClientError, ComicClient, ComicId, FetchRequest};
/// # struct Library;
/// # impl ComicClient for Library {
/// #     fn download_album(&self, _: &ComicId, _: &FetchRequest) -> Result<(), ClientError> { Ok(()) }
/// # }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = ComicDownloader::new(Config::default(), std::sync::Arc::new(Library)).await?;
///
///     // Hand clones to the chat front end, then block until a signal
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: ComicDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; fall back to ctrl_c
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal"),
            }
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers, waiting on the other");
            only.recv().await;
            tracing::info!("Received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
