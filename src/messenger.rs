//! Delivery boundary to the chat platform
//!
//! The downloader only needs two fire-and-forget operations: send a line of
//! text and send a file. Transport errors are the implementation's business.

use async_trait::async_trait;
use std::path::Path;

/// Sends status text and finished archives back to the requester
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain-text status message
    async fn send_text(&self, text: &str);

    /// Send a file under the given display name
    async fn send_file(&self, path: &Path, display_name: &str);
}

/// Messenger that only logs, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMessenger;

#[async_trait]
impl Messenger for NoOpMessenger {
    async fn send_text(&self, text: &str) {
        tracing::debug!(text, "message dropped (no messenger)");
    }

    async fn send_file(&self, path: &Path, display_name: &str) {
        tracing::debug!(?path, display_name, "file dropped (no messenger)");
    }
}
