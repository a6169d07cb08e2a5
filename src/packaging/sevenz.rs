use crate::error::{PackageError, Result};
use sevenz_rust::lzma::LZMA2Options;
use sevenz_rust::{
    AesEncoderOptions, MethodOptions, Password, SevenZArchiveEntry, SevenZMethod,
    SevenZMethodConfiguration, SevenZReader, SevenZWriter,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::ArchiveBackend;

/// 7z archive writer (LZMA2, optional AES-256 with encrypted header)
pub struct SevenZipBackend {
    level: u32,
}

impl SevenZipBackend {
    /// Create a backend with the given LZMA2 preset, clamped to 0-9
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    fn failed(source: &Path, dest: &Path, reason: impl std::fmt::Display) -> PackageError {
        PackageError::CompressionFailed {
            folder: source.to_path_buf(),
            archive: dest.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Archive entry name for a path below `source`, rooted at `inner_name`
    fn entry_name(source: &Path, path: &Path, inner_name: &str) -> Option<String> {
        let relative = path.strip_prefix(source).ok()?;
        let mut name = inner_name.to_string();
        for component in relative.components() {
            name.push('/');
            name.push_str(component.as_os_str().to_str()?);
        }
        Some(name)
    }
}

impl Default for SevenZipBackend {
    fn default() -> Self {
        Self::new(9)
    }
}

impl ArchiveBackend for SevenZipBackend {
    fn extension(&self) -> &'static str {
        "7z"
    }

    fn compress(
        &self,
        source: &Path,
        dest: &Path,
        inner_name: &str,
        password: Option<&str>,
    ) -> Result<()> {
        let mut writer =
            SevenZWriter::create(dest).map_err(|e| Self::failed(source, dest, e))?;

        let mut methods: Vec<SevenZMethodConfiguration> = Vec::with_capacity(2);
        if let Some(password) = password {
            methods.push(AesEncoderOptions::new(Password::from(password)).into());
        }
        methods.push(
            SevenZMethodConfiguration::new(SevenZMethod::LZMA2).with_options(
                MethodOptions::LZMA2(LZMA2Options::with_preset(self.level)),
            ),
        );
        writer.set_content_methods(methods);
        if password.is_some() {
            // File names live in the header; encrypting it hides the listing too
            writer.set_encrypt_header(true);
        }

        writer
            .push_archive_entry::<File>(
                SevenZArchiveEntry::from_path(source, inner_name.to_string()),
                None,
            )
            .map_err(|e| Self::failed(source, dest, e))?;

        let mut file_count = 0usize;
        for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Self::failed(source, dest, e))?;
            let path: PathBuf = entry.path().to_path_buf();
            let name = Self::entry_name(source, &path, inner_name).ok_or_else(|| {
                PackageError::InvalidPath {
                    path: path.clone(),
                    reason: "file name is not valid UTF-8".to_string(),
                }
            })?;

            let archive_entry = SevenZArchiveEntry::from_path(&path, name);
            if entry.file_type().is_dir() {
                writer
                    .push_archive_entry::<File>(archive_entry, None)
                    .map_err(|e| Self::failed(source, dest, e))?;
            } else {
                let file = File::open(&path).map_err(|e| Self::failed(source, dest, e))?;
                writer
                    .push_archive_entry(archive_entry, Some(file))
                    .map_err(|e| Self::failed(source, dest, e))?;
                file_count += 1;
            }
        }

        writer.finish().map_err(|e| Self::failed(source, dest, e))?;

        debug!(?source, ?dest, file_count, level = self.level, "7z archive written");
        Ok(())
    }

    fn opens_with(&self, archive: &Path, password: Option<&str>) -> bool {
        // Opening reads and decodes the header, which is encrypted along with the contents
        let opens = |password: Password| SevenZReader::open(archive, password).is_ok();
        match password {
            None => opens(Password::empty()),
            Some(password) => !opens(Password::empty()) && opens(Password::from(password)),
        }
    }
}
