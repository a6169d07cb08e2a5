//! Configuration types for comic-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Network options handed to the external download library
///
/// Groups settings that only matter to the scraping library. Used as a
/// flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Candidate domains, primary first (default: three public mirrors)
    #[serde(default = "default_domain_list")]
    pub domain_list: Vec<String>,

    /// Optional proxy URL (e.g. "http://127.0.0.1:7890")
    #[serde(default)]
    pub proxy: Option<String>,

    /// Optional session cookie for the site
    #[serde(default, alias = "avs_cookie")]
    pub cookie: Option<String>,

    /// Image download threads used by the library for one album (default: 10)
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            domain_list: default_domain_list(),
            proxy: None,
            cookie: None,
            max_threads: default_max_threads(),
        }
    }
}

/// Download behavior configuration (directories, concurrency, deadline)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Data directory holding downloads/, archives/ and covers/ (default: "./comic_data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum concurrent album downloads (default: 2, capped at 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Folder naming rule passed through to the library (default: "Bd_Aid_Atitle")
    #[serde(default = "default_dir_rule")]
    pub dir_rule: String,

    /// Deadline for one album download including backup domains (default: 30 minutes)
    ///
    /// None waits for the library indefinitely.
    #[serde(default = "default_download_timeout", with = "optional_duration_serde")]
    pub timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            dir_rule: default_dir_rule(),
            timeout: default_download_timeout(),
        }
    }
}

/// Archive packaging and password configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackagingConfig {
    /// Custom archive password; empty means derive one from the comic id
    #[serde(default)]
    pub zip_password: String,

    /// Prefix of the derived default password (default: "jm")
    #[serde(default = "default_password_prefix")]
    pub default_password_prefix: String,

    /// Encrypt archives at all (default: true)
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// LZMA2 preset, 0 (fastest) to 9 (smallest) (default: 9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            zip_password: String::new(),
            default_password_prefix: default_password_prefix(),
            encrypt: true,
            compression_level: default_compression_level(),
        }
    }
}

/// Backup domain retry configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Alternates tried after the primary domain fails (default: 2, capped at 2)
    #[serde(default = "default_max_backup_domains")]
    pub max_backup_domains: usize,

    /// Pause between domain attempts (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub delay: Duration,

    /// Add random jitter to the pause (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_backup_domains: default_max_backup_domains(),
            delay: default_retry_delay(),
            jitter: true,
        }
    }
}

/// Storage quota and disk space configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Quota for archives and covers in MiB; 0 disables eviction (default: 2048)
    #[serde(default = "default_max_storage_mb")]
    pub max_storage_mb: u64,

    /// Files older than this may be evicted when over quota (default: 7 days)
    #[serde(default = "default_max_file_age", with = "duration_serde")]
    pub max_file_age: Duration,

    /// Refuse new downloads below `min_free_space` (default: true)
    #[serde(default = "default_true")]
    pub disk_space_check: bool,

    /// Minimum free space to keep on the data volume in bytes (default: 512 MiB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_storage_mb: default_max_storage_mb(),
            max_file_age: default_max_file_age(),
            disk_space_check: true,
            min_free_space: default_min_free_space(),
        }
    }
}

/// Main configuration for ComicDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`network`](NetworkConfig): domains, proxy, cookie, library threads
/// - [`download`](DownloadConfig): directories, concurrency, deadline
/// - [`packaging`](PackagingConfig): password and compression
///
/// These three are flattened, so the JSON file stays a flat object the way
/// chat-bot plugin configs usually are. `retry` and `storage` stay nested.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network options for the download library
    #[serde(flatten)]
    pub network: NetworkConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Packaging settings
    #[serde(flatten)]
    pub packaging: PackagingConfig,

    /// Backup domain retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Storage quota and disk space settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults
    ///
    /// A missing or malformed file is logged and replaced by [`Config::default`],
    /// so a broken config never keeps the plugin from starting.
    pub fn load(path: &Path) -> Config {
        if !path.exists() {
            tracing::warn!(?path, "config file not found, using defaults");
            return Config::default();
        }

        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(?path, error = %e, "failed to load config, using defaults");
                Config::default()
            }
        }
    }

    /// Load and validate configuration from a JSON file
    pub fn try_load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(?path, "config saved");
        Ok(())
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self
            .network
            .domain_list
            .iter()
            .all(|domain| domain.trim().is_empty())
        {
            return Err(Error::Config {
                message: "at least one domain is required".to_string(),
                key: Some("domain_list".to_string()),
            });
        }

        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }

        if self.packaging.compression_level > 9 {
            return Err(Error::Config {
                message: format!(
                    "compression_level must be between 0 and 9, got {}",
                    self.packaging.compression_level
                ),
                key: Some("compression_level".to_string()),
            });
        }

        Ok(())
    }
}

/// Configuration values that can be changed while the downloader is running
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Candidate domains, primary first
    pub domain_list: Vec<String>,
    /// Custom archive password; empty means derived
    pub zip_password: String,
}

impl RuntimeSettings {
    /// Custom password, if one is set
    pub fn custom_password(&self) -> Option<&str> {
        Some(self.zip_password.as_str()).filter(|p| !p.is_empty())
    }
}

impl From<&Config> for RuntimeSettings {
    fn from(config: &Config) -> Self {
        Self {
            domain_list: config.network.domain_list.clone(),
            zip_password: config.packaging.zip_password.clone(),
        }
    }
}

// Default value functions
fn default_domain_list() -> Vec<String> {
    vec![
        "18comic.vip".to_string(),
        "jm365.xyz".to_string(),
        "18comic.org".to_string(),
    ]
}

fn default_max_threads() -> usize {
    10
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("comic_data")
}

fn default_max_concurrent() -> usize {
    2
}

fn default_dir_rule() -> String {
    "Bd_Aid_Atitle".to_string()
}

fn default_download_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30 * 60))
}

fn default_password_prefix() -> String {
    "jm".to_string()
}

fn default_true() -> bool {
    true
}

fn default_compression_level() -> u32 {
    9
}

fn default_max_backup_domains() -> usize {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_storage_mb() -> u64 {
    2048
}

fn default_max_file_age() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_min_free_space() -> u64 {
    512 * 1024 * 1024
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
