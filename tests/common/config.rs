//! Test configuration and downloader construction

use comic_dl::{ComicClient, ComicDownloader, Config};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Domains used by every integration test, primary first
pub const DOMAINS: [&str; 3] = ["mirror-a.example", "mirror-b.example", "mirror-c.example"];

/// Configuration rooted at `data_dir` with instant retries and fast compression
pub fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.data_dir = data_dir.to_path_buf();
    config.network.domain_list = DOMAINS.iter().map(|d| d.to_string()).collect();
    config.retry.delay = Duration::ZERO;
    config.retry.jitter = false;
    config.storage.disk_space_check = false;
    config.packaging.compression_level = 1;
    config
}

/// Build a downloader in a fresh temp dir; keep the `TempDir` alive for the test
pub async fn create_downloader(client: Arc<dyn ComicClient>) -> (ComicDownloader, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());
    let downloader = ComicDownloader::new(config, client)
        .await
        .expect("Failed to create downloader");
    (downloader, temp_dir)
}
