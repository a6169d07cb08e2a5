//! Plain-text report explaining how an identifier maps to folders on disk.

use crate::error::Result;
use crate::packaging::archive_size;
use crate::resolver::FolderResolver;
use crate::types::ComicId;
use crate::utils::format_size;
use std::fmt::Write as _;

use super::ComicDownloader;
use super::pool::worker_failed;

/// Folders listed in a debug report before the rest is summarized
const REPORT_FOLDER_LIMIT: usize = 10;

impl ComicDownloader {
    /// Describe paths, folder matches and archive state for `raw_id`
    ///
    /// Meant to be sent back verbatim when a user asks why a download was not
    /// found. Lists the first 10 download folders with the tier each matches.
    pub async fn debug_report(&self, raw_id: &str) -> Result<String> {
        let id = ComicId::parse(raw_id)?;
        let settings = self.runtime_settings().await;
        let download_dir = self.layout.download_dir.clone();
        let archive_path = self.layout.archive_path(&id, self.packager.extension());

        let (folders, resolved) = tokio::task::spawn_blocking({
            let id = id.clone();
            let download_dir = download_dir.clone();
            move || {
                (
                    FolderResolver::diagnose(&id, &download_dir),
                    FolderResolver::resolve(&id, &download_dir),
                )
            }
        })
        .await
        .map_err(worker_failed)?;

        let mut report = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(report, "=== debug report for comic {id} ===");
        let _ = writeln!(report, "data dir: {}", self.layout.root.display());
        let _ = writeln!(report, "download dir: {}", download_dir.display());
        let _ = writeln!(report, "archive dir: {}", self.layout.archive_dir.display());
        let _ = writeln!(
            report,
            "custom password: {}",
            if settings.custom_password().is_some() { "yes" } else { "no" }
        );
        let _ = writeln!(report, "domains: {}", settings.domain_list.join(", "));
        let _ = writeln!(
            report,
            "proxy: {}",
            self.config.network.proxy.as_deref().unwrap_or("none")
        );
        let _ = writeln!(report, "in flight: {}", self.in_flight.contains(&id));

        let _ = writeln!(report, "\nfolders:");
        match folders {
            Ok(folders) if folders.is_empty() => {
                let _ = writeln!(report, "  (no folders in download dir)");
            }
            Ok(folders) => {
                for folder in folders.iter().take(REPORT_FOLDER_LIMIT) {
                    match (folder.tier, folder.rule) {
                        (Some(tier), Some(rule)) => {
                            let _ = writeln!(report, "  - {} [{tier}: {rule}]", folder.name);
                        }
                        (Some(tier), None) => {
                            let _ = writeln!(report, "  - {} [{tier}]", folder.name);
                        }
                        _ => {
                            let _ = writeln!(report, "  - {}", folder.name);
                        }
                    }
                }
                if folders.len() > REPORT_FOLDER_LIMIT {
                    let _ = writeln!(
                        report,
                        "  ... and {} more",
                        folders.len() - REPORT_FOLDER_LIMIT
                    );
                }
            }
            Err(e) => {
                let _ = writeln!(report, "  (cannot read download dir: {e})");
            }
        }

        let _ = writeln!(report, "\nresolved folder:");
        match resolved {
            Some(path) => {
                let _ = writeln!(report, "  {}", path.display());
            }
            None => {
                let _ = writeln!(report, "  none");
            }
        }

        let _ = writeln!(report, "\narchive: {}", archive_path.display());
        match archive_size(&archive_path) {
            Some(size) => {
                let _ = write!(report, "archive present: yes ({})", format_size(size));
            }
            None => {
                let _ = write!(report, "archive present: no");
            }
        }

        Ok(report)
    }
}
