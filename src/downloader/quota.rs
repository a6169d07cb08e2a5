//! Disk space check and storage quota enforcement.

use crate::error::{Error, Result};
use crate::storage::{EvictionReport, evict_stale};
use crate::types::Event;

use super::ComicDownloader;
use super::pool::worker_failed;

impl ComicDownloader {
    /// Refuse new downloads when the data volume is nearly full
    ///
    /// Album size is unknown before downloading, so the check only keeps
    /// `storage.min_free_space` bytes free. Does nothing when disabled.
    pub async fn check_disk_space(&self) -> Result<()> {
        if !self.config.storage.disk_space_check {
            return Ok(());
        }

        let required = self.config.storage.min_free_space;
        let check_path = self.layout.download_dir.clone();

        let available = tokio::task::spawn_blocking({
            let check_path = check_path.clone();
            move || crate::utils::get_available_space(&check_path)
        })
        .await
        .map_err(worker_failed)?
        .map_err(|e| {
            Error::DiskSpaceCheckFailed(format!(
                "Failed to check disk space for '{}': {}",
                check_path.display(),
                e
            ))
        })?;

        if available < required {
            tracing::warn!(available, required, "not enough free disk space for a new download");
            return Err(Error::InsufficientSpace {
                required,
                available,
            });
        }

        Ok(())
    }

    /// Delete stale archives and covers while storage is over quota
    ///
    /// A quota of 0 disables eviction. Every deleted file is announced with
    /// [`Event::Evicted`].
    pub async fn enforce_storage_quota(&self) -> Result<EvictionReport> {
        let quota_mb = self.config.storage.max_storage_mb;
        if quota_mb == 0 {
            return Ok(EvictionReport::default());
        }

        let quota_bytes = quota_mb.saturating_mul(1024 * 1024);
        let max_age = self.config.storage.max_file_age;
        let layout = self.layout.clone();

        let report = tokio::task::spawn_blocking(move || {
            evict_stale(&layout.evictable_dirs(), quota_bytes, max_age, chrono::Utc::now())
        })
        .await
        .map_err(worker_failed)??;

        for file in &report.evicted {
            self.emit_event(Event::Evicted {
                path: file.path.clone(),
                size_bytes: file.size_bytes,
            });
        }

        if !report.evicted.is_empty() {
            tracing::info!(
                evicted = report.evicted.len(),
                total_before = report.total_before,
                total_after = report.total_after,
                quota_bytes,
                "storage quota enforced"
            );
        }

        Ok(report)
    }
}
