//! Download coordinator split into focused submodules.
//!
//! The `ComicDownloader` struct and its methods are organized by concern:
//! - [`in_flight`] - Per-identifier exclusion
//! - [`pool`] - Bounded worker pool for blocking work
//! - [`request`] - The fetch, resolve and package pipeline
//! - [`quota`] - Disk space check and storage eviction
//! - [`config_ops`] - Runtime configuration updates
//! - [`diagnostics`] - Folder matching report
//! - [`lifecycle`] - Shutdown coordination

mod config_ops;
mod diagnostics;
mod in_flight;
mod lifecycle;
mod pool;
mod quota;
mod request;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use in_flight::{InFlightGuard, InFlightSet};
pub use pool::{MAX_WORKER_THREADS, WorkerPool};

use crate::client::ComicClient;
use crate::config::{Config, RuntimeSettings};
use crate::error::Result;
use crate::packaging::{ArchiveBackend, Packager, SevenZipBackend};
use crate::storage::StorageLayout;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ComicDownloader {
    /// Static configuration
    pub(crate) config: Arc<Config>,
    /// Directory layout under the data directory
    pub(crate) layout: Arc<StorageLayout>,
    /// External download library
    pub(crate) client: Arc<dyn ComicClient>,
    /// Folder to archive packager
    pub(crate) packager: Packager,
    /// Identifiers currently being processed
    pub(crate) in_flight: InFlightSet,
    /// Bounded pool for downloads and compression
    pub(crate) pool: WorkerPool,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cleared when shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Settings that can change while running (domains, password)
    pub(crate) settings: Arc<tokio::sync::RwLock<RuntimeSettings>>,
}

impl ComicDownloader {
    /// Create a downloader that packages with 7z
    ///
    /// Validates the configuration and creates the data directories.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use comic_dl::client::{ClientError, ComicClient, FetchRequest};
    /// use comic_dl::types::ComicId;
    /// use comic_dl::{ComicDownloader, Config};
    /// use std::sync::Arc;
    ///
    /// struct Library;
    ///
    /// impl ComicClient for Library {
    ///     fn download_album(&self, _: &ComicId, _: &FetchRequest) -> Result<(), ClientError> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = ComicDownloader::new(Config::default(), Arc::new(Library)).await?;
    ///     let archive = downloader.fetch_archive("422866").await?;
    ///     println!("{} ({} bytes)", archive.path.display(), archive.size_bytes);
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: Config, client: Arc<dyn ComicClient>) -> Result<Self> {
        let backend = Arc::new(SevenZipBackend::new(config.packaging.compression_level));
        Self::with_backend(config, client, backend).await
    }

    /// Create a downloader with a custom archive backend
    pub async fn with_backend(
        config: Config,
        client: Arc<dyn ComicClient>,
        backend: Arc<dyn ArchiveBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let layout = StorageLayout::new(&config.download.data_dir);
        layout.ensure_dirs().await?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);
        let pool = WorkerPool::new(config.download.max_concurrent_downloads);
        let settings = RuntimeSettings::from(&config);

        tracing::info!(
            data_dir = ?layout.root,
            workers = pool.size(),
            domains = settings.domain_list.len(),
            archive_format = backend.extension(),
            "comic downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            layout: Arc::new(layout),
            client,
            packager: Packager::new(backend),
            in_flight: InFlightSet::new(),
            pool,
            event_tx,
            accepting_new: Arc::new(AtomicBool::new(true)),
            settings: Arc::new(tokio::sync::RwLock::new(settings)),
        })
    }

    /// Subscribe to request events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls behind by more than 1000 events gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Directory layout in use
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Identifiers currently being processed
    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// Emit an event; dropped silently when nobody is subscribed
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
