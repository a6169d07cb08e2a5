//! Runtime configuration updates: archive password and domain list.

use crate::config::{Config, RuntimeSettings};
use crate::error::{Error, Result};
use std::path::Path;

use super::ComicDownloader;

impl ComicDownloader {
    /// Set or clear the custom archive password
    ///
    /// `None` or an empty string returns to the derived default password.
    /// Cached archives locked with another password are rebuilt on their next request.
    pub async fn set_password(&self, password: Option<String>) {
        let password = password.unwrap_or_default();
        let custom = !password.is_empty();
        self.settings.write().await.zip_password = password;
        tracing::info!(custom, "archive password changed");
    }

    /// Replace the domain list (primary first)
    ///
    /// Blank entries are dropped; a list without any domain is rejected and
    /// the current list is kept.
    pub async fn set_domains(&self, domains: Vec<String>) -> Result<()> {
        let domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        if domains.is_empty() {
            return Err(Error::Config {
                message: "at least one domain is required".to_string(),
                key: Some("domain_list".to_string()),
            });
        }

        tracing::info!(primary = %domains[0], count = domains.len(), "domain list changed");
        self.settings.write().await.domain_list = domains;
        Ok(())
    }

    /// Current runtime settings
    pub async fn runtime_settings(&self) -> RuntimeSettings {
        self.settings.read().await.clone()
    }

    /// Write the configuration, including runtime changes, to `path`
    pub async fn save_config(&self, path: &Path) -> Result<()> {
        let settings = self.runtime_settings().await;
        let mut config: Config = (*self.config).clone();
        config.network.domain_list = settings.domain_list;
        config.packaging.zip_password = settings.zip_password;

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || config.save(&path))
            .await
            .map_err(super::pool::worker_failed)?
    }
}
