//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::time::Duration;

use super::ComicDownloader;

/// How long shutdown waits for in-flight requests
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl ComicDownloader {
    /// Gracefully shut down the downloader
    ///
    /// 1. Stops accepting new requests ([`Error::ShuttingDown`](crate::Error::ShuttingDown))
    /// 2. Waits up to 30 seconds for in-flight identifiers to drain
    /// 3. Emits [`Event::Shutdown`]
    ///
    /// Blocking downloads cannot be interrupted; any still running after the
    /// wait keep their worker thread until the library returns.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new requests");

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_in_flight()).await {
            Ok(()) => tracing::info!("All in-flight requests completed"),
            Err(_) => tracing::warn!(
                remaining = self.in_flight.len(),
                "Timeout waiting for in-flight requests, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new requests are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn wait_for_in_flight(&self) {
        loop {
            let active = self.in_flight.len();
            if active == 0 {
                return;
            }
            tracing::debug!(active, "Waiting for in-flight requests to complete");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
