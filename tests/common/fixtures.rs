//! Fake download library and messenger

use async_trait::async_trait;
use comic_dl::{ClientError, ComicClient, ComicId, FetchRequest, Messenger};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Pages written into every fake album
pub const PAGES: [(&str, &[u8]); 3] = [
    ("00001.jpg", b"cover page"),
    ("00002.jpg", b"second page"),
    ("00003.jpg", b"last page"),
];

/// Scraping library stand-in that lays albums out like `Bd_Aid_Atitle`
pub struct AlbumClient {
    /// `{id}` is replaced by the comic id
    pub folder_template: String,
    /// Domains that fail with a connectivity error
    pub down: Vec<String>,
    /// Time spent "downloading"
    pub delay: Duration,
    /// Every (id, domain) the library was called with
    pub calls: Mutex<Vec<(String, String)>>,
}

impl AlbumClient {
    /// Library that always succeeds with `{id}_<title>` folders
    pub fn titled(title: &str) -> Self {
        Self {
            folder_template: format!("{{id}}_{title}"),
            down: Vec::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of library calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Domains called, in order
    pub fn domains_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, domain)| domain.clone())
            .collect()
    }
}

impl ComicClient for AlbumClient {
    fn download_album(&self, id: &ComicId, request: &FetchRequest) -> Result<(), ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((id.to_string(), request.domain.clone()));
        std::thread::sleep(self.delay);

        if self.down.contains(&request.domain) {
            return Err(ClientError::new(format!(
                "HTTPSConnectionPool(host='{}'): Max retries exceeded: connection refused",
                request.domain
            )));
        }

        let folder = request
            .base_dir
            .join(self.folder_template.replace("{id}", id.as_str()));
        std::fs::create_dir_all(&folder).map_err(|e| ClientError::new(e.to_string()))?;
        for (name, content) in PAGES {
            std::fs::write(folder.join(name), content)
                .map_err(|e| ClientError::new(e.to_string()))?;
        }
        Ok(())
    }
}

/// Messenger that records what it was asked to send
#[derive(Default)]
pub struct RecordingMessenger {
    /// Text messages, in order
    pub texts: Mutex<Vec<String>>,
    /// Files as (path, display name)
    pub files: Mutex<Vec<(PathBuf, String)>>,
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
