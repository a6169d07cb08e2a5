//! Shared test helpers for creating ComicDownloader instances in tests.

use crate::client::{ClientError, ComicClient, FetchRequest};
use crate::config::Config;
use crate::downloader::ComicDownloader;
use crate::messenger::Messenger;
use crate::types::ComicId;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Domains configured by [`create_test_downloader`], primary first
pub(crate) const TEST_DOMAINS: [&str; 4] = [
    "primary.example",
    "backup1.example",
    "backup2.example",
    "backup3.example",
];

/// Stand-in for the scraping library
///
/// Writes a small album folder named after `folder_template` (`{id}` is
/// replaced) and records every domain it was called with.
pub(crate) struct FakeClient {
    folder_template: Option<String>,
    failing: HashSet<String>,
    failure_message: String,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self {
            folder_template: Some("{id}_Test Comic".to_string()),
            failing: HashSet::new(),
            failure_message: "connection refused".to_string(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Name the album folder after this template
    pub(crate) fn folder(mut self, template: &str) -> Self {
        self.folder_template = Some(template.to_string());
        self
    }

    /// Report success without writing anything
    pub(crate) fn without_output(mut self) -> Self {
        self.folder_template = None;
        self
    }

    /// Fail on these domains with `message`
    pub(crate) fn failing(mut self, domains: &[&str], message: &str) -> Self {
        self.failing = domains.iter().map(|d| d.to_string()).collect();
        self.failure_message = message.to_string();
        self
    }

    /// Block for `delay` before doing anything
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Domains tried so far, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ComicClient for FakeClient {
    fn download_album(&self, id: &ComicId, request: &FetchRequest) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(request.domain.clone());
        std::thread::sleep(self.delay);

        if self.failing.contains(&request.domain) {
            return Err(ClientError::new(self.failure_message.clone()));
        }

        if let Some(template) = &self.folder_template {
            let folder = request.base_dir.join(template.replace("{id}", id.as_str()));
            std::fs::create_dir_all(&folder).map_err(|e| ClientError::new(e.to_string()))?;
            for page in 1..=3 {
                std::fs::write(folder.join(format!("{page:05}.jpg")), format!("page {page}"))
                    .map_err(|e| ClientError::new(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Messenger that keeps everything it was asked to send
#[derive(Default)]
pub(crate) struct RecordingMessenger {
    pub(crate) texts: Mutex<Vec<String>>,
    pub(crate) files: Mutex<Vec<(PathBuf, String)>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }

    async fn send_file(&self, path: &Path, display_name: &str) {
        self.files
            .lock()
            .unwrap()
            .push((path.to_path_buf(), display_name.to_string()));
    }
}

/// Test configuration rooted in `data_dir`: no retry pause, no disk space check, fast compression
pub(crate) fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.data_dir = data_dir.to_path_buf();
    config.download.max_concurrent_downloads = 2;
    config.network.domain_list = TEST_DOMAINS.iter().map(|d| d.to_string()).collect();
    config.retry.delay = Duration::ZERO;
    config.retry.jitter = false;
    config.storage.disk_space_check = false;
    config.packaging.compression_level = 1;
    config
}

/// Helper to create a test ComicDownloader over `client`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    client: Arc<FakeClient>,
) -> (ComicDownloader, tempfile::TempDir) {
    create_test_downloader_with(client, |_| {}).await
}

/// Like [`create_test_downloader`], letting the test adjust the config first
pub(crate) async fn create_test_downloader_with(
    client: Arc<FakeClient>,
    adjust: impl FnOnce(&mut Config),
) -> (ComicDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    adjust(&mut config);

    let downloader = ComicDownloader::new(config, client).await.unwrap();
    (downloader, temp_dir)
}

/// Drain every event received so far
pub(crate) fn drain_events(
    rx: &mut tokio::sync::broadcast::Receiver<crate::types::Event>,
) -> Vec<crate::types::Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
