//! Request pipeline: dedup, download with domain fallback, resolve, package.

use crate::client::FetchRequest;
use crate::error::{DownloadError, Error, Result};
use crate::messenger::Messenger;
use crate::packaging::{PackageOutcome, archive_size, derive_password};
use crate::resolver::FolderResolver;
use crate::retry::with_domain_fallback;
use crate::types::{ArchiveHandle, ComicId, Event};
use crate::utils::format_size;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use super::ComicDownloader;
use super::in_flight::InFlightGuard;
use super::pool::worker_failed;

/// Password decision for one archive
struct PasswordChoice {
    password: Option<String>,
    custom: bool,
}

impl ComicDownloader {
    /// Produce the archive for a comic, downloading and packaging it if needed
    ///
    /// An existing archive is returned as-is when it opens with the password
    /// the current settings would use. A second request for an identifier that
    /// is still being processed fails immediately with
    /// [`Error::AlreadyInFlight`].
    ///
    /// The work runs in its own task. Dropping the returned future does not
    /// cancel it: the identifier stays in flight until download and packaging
    /// have actually stopped, and a later request reuses the finished archive.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown) began
    /// - [`Error::InvalidId`] for malformed identifiers (no side effects)
    /// - [`Error::AlreadyInFlight`] when another request holds the identifier
    /// - [`Error::InsufficientSpace`] below the configured free space
    /// - [`Error::Download`] when every domain failed or the deadline passed
    /// - [`Error::ResolutionMiss`] when no downloaded folder matches
    /// - [`Error::Package`] when compression failed (downloaded files are kept)
    pub async fn fetch_archive(&self, raw_id: &str) -> Result<ArchiveHandle> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = ComicId::parse(raw_id)?;

        let downloader = self.clone();
        tokio::spawn(async move { downloader.process_request(id).await })
            .await
            .map_err(worker_failed)?
    }

    async fn process_request(&self, id: ComicId) -> Result<ArchiveHandle> {
        match self.fetch_validated(&id).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                if !matches!(e, Error::AlreadyInFlight(_)) {
                    tracing::error!(comic_id = %id, code = e.error_code(), error = %e, "comic request failed");
                }
                self.emit_event(Event::Failed {
                    id: id.clone(),
                    code: e.error_code().to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn fetch_validated(&self, id: &ComicId) -> Result<ArchiveHandle> {
        let archive_path = self.layout.archive_path(id, self.packager.extension());
        let password = self.password_for(id).await;

        if let Some(handle) = self.existing_archive(id, &archive_path, &password).await? {
            return Ok(handle);
        }

        let guard = self.in_flight.try_acquire(id)?;
        self.emit_event(Event::Accepted { id: id.clone() });
        tracing::info!(comic_id = %id, "comic request accepted");

        // Another request may have finished between the first check and acquiring
        if let Some(handle) = self.existing_archive(id, &archive_path, &password).await? {
            return Ok(handle);
        }

        self.check_disk_space().await?;
        if let Err(e) = self.enforce_storage_quota().await {
            tracing::warn!(error = %e, "storage quota enforcement failed");
        }

        let (domain, guard) = self.download(id, guard).await?;
        self.emit_event(Event::Downloaded {
            id: id.clone(),
            domain,
        });

        let folder = self.resolve_folder(id).await?;
        self.emit_event(Event::Resolved {
            id: id.clone(),
            folder: folder.clone(),
        });

        let outcome = self
            .package_folder(id, &folder, &archive_path, password.password.clone())
            .await?;
        drop(guard);

        self.emit_event(Event::Packaged {
            id: id.clone(),
            archive: outcome.archive.clone(),
            size_bytes: outcome.size_bytes,
        });

        Ok(ArchiveHandle {
            id: id.clone(),
            display_name: self.display_name(id),
            path: outcome.archive,
            size_bytes: outcome.size_bytes,
            reused: false,
            custom_password: password.custom,
        })
    }

    /// Handle a chat request end to end
    ///
    /// Sends progress and result text through `messenger`, delivers the archive
    /// as a file, and converts every failure into a message. Never fails.
    pub async fn handle_request(
        &self,
        raw_id: &str,
        messenger: &dyn Messenger,
    ) -> Option<ArchiveHandle> {
        let id = match ComicId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                messenger.send_text(&e.user_message()).await;
                return None;
            }
        };

        messenger
            .send_text(&format!("Fetching comic {id}, this may take a while..."))
            .await;

        match self.fetch_archive(id.as_str()).await {
            Ok(handle) => {
                let password_note = if handle.custom_password {
                    "custom password"
                } else if self.config.packaging.encrypt {
                    "default password"
                } else {
                    "no password"
                };
                let reuse_note = if handle.reused { ", cached" } else { "" };
                messenger
                    .send_text(&format!(
                        "Comic {id} is ready ({}, {password_note}{reuse_note}), sending...",
                        format_size(handle.size_bytes)
                    ))
                    .await;
                messenger.send_file(&handle.path, &handle.display_name).await;
                Some(handle)
            }
            Err(e) => {
                messenger.send_text(&e.user_message()).await;
                None
            }
        }
    }

    /// Reuse a valid archive if one is already on disk
    ///
    /// An archive packaged under a different password is left to be rebuilt,
    /// so the password reported with a handle always opens its file.
    async fn existing_archive(
        &self,
        id: &ComicId,
        archive_path: &Path,
        password: &PasswordChoice,
    ) -> Result<Option<ArchiveHandle>> {
        let Some(size_bytes) = archive_size(archive_path) else {
            return Ok(None);
        };

        let packager = self.packager.clone();
        let path = archive_path.to_path_buf();
        let expected = password.password.clone();
        let matches =
            tokio::task::spawn_blocking(move || packager.opens_with(&path, expected.as_deref()))
                .await
                .map_err(worker_failed)?;
        if !matches {
            tracing::info!(
                comic_id = %id,
                archive = ?archive_path,
                "archive was packaged with a different password, rebuilding"
            );
            return Ok(None);
        }

        tracing::info!(comic_id = %id, archive = ?archive_path, size_bytes, "reusing existing archive");
        self.emit_event(Event::Reused {
            id: id.clone(),
            archive: archive_path.to_path_buf(),
        });
        Ok(Some(ArchiveHandle {
            id: id.clone(),
            path: archive_path.to_path_buf(),
            display_name: self.display_name(id),
            size_bytes,
            reused: true,
            custom_password: password.custom,
        }))
    }

    async fn password_for(&self, id: &ComicId) -> PasswordChoice {
        if !self.config.packaging.encrypt {
            return PasswordChoice {
                password: None,
                custom: false,
            };
        }
        let settings = self.settings.read().await;
        let custom = settings.custom_password();
        PasswordChoice {
            password: Some(derive_password(
                custom.unwrap_or_default(),
                &self.config.packaging.default_password_prefix,
                id,
            )),
            custom: custom.is_some(),
        }
    }

    fn display_name(&self, id: &ComicId) -> String {
        format!("{id}.{}", self.packager.extension())
    }

    /// Run the external download on the pool, bounded by the configured deadline
    ///
    /// Returns the domain that succeeded and hands the guard back. On timeout
    /// the guard moves to a task that waits for the abandoned worker, so the
    /// identifier stays in flight until nothing writes to its folder anymore.
    async fn download(
        &self,
        id: &ComicId,
        guard: InFlightGuard,
    ) -> Result<(String, InFlightGuard)> {
        let domains = self.settings.read().await.domain_list.clone();
        let request = FetchRequest {
            domain: String::new(),
            base_dir: self.layout.download_dir.clone(),
            dir_rule: self.config.download.dir_rule.clone(),
            proxy: self.config.network.proxy.clone(),
            cookie: self.config.network.cookie.clone(),
            image_threads: self.config.network.max_threads,
        };

        let client = self.client.clone();
        let retry = self.config.retry.clone();
        let event_tx = self.event_tx.clone();
        let job_id = id.clone();

        let mut handle = self.pool.spawn(move || {
            with_domain_fallback(&domains, &retry, |domain| {
                event_tx
                    .send(Event::Downloading {
                        id: job_id.clone(),
                        domain: domain.to_string(),
                    })
                    .ok();
                tracing::info!(comic_id = %job_id, domain, "downloading album");

                client
                    .download_album(&job_id, &request.with_domain(domain))
                    .inspect_err(|e| {
                        event_tx
                            .send(Event::DomainFailed {
                                id: job_id.clone(),
                                domain: domain.to_string(),
                                error: e.message.clone(),
                            })
                            .ok();
                    })
            })
        });

        let joined = match self.config.download.timeout {
            None => (&mut handle).await,
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(
                        comic_id = %id,
                        timeout_secs = limit.as_secs(),
                        "download deadline passed, identifier stays reserved until the worker returns"
                    );
                    tokio::spawn(async move {
                        let _ = handle.await;
                        tracing::debug!(comic_id = %guard.id(), "abandoned download finished");
                        drop(guard);
                    });
                    return Err(DownloadError::TimedOut {
                        id: id.to_string(),
                        after: limit,
                    }
                    .into());
                }
            },
        };

        match joined.map_err(worker_failed)?? {
            None => Err(DownloadError::NoDomains.into()),
            Some(Ok((domain, ()))) => Ok((domain, guard)),
            Some(Err(failure)) => Err(DownloadError::Failed {
                id: id.to_string(),
                domain: failure.domain,
                kind: failure.error.kind(),
                message: failure.error.message,
                attempts: failure.attempts,
            }
            .into()),
        }
    }

    async fn resolve_folder(&self, id: &ComicId) -> Result<PathBuf> {
        let base_dir = self.layout.download_dir.clone();
        let lookup_id = id.clone();
        let lookup_dir = base_dir.clone();
        let found = tokio::task::spawn_blocking(move || {
            FolderResolver::resolve(&lookup_id, &lookup_dir)
        })
        .await
        .map_err(worker_failed)?;

        found.ok_or_else(|| {
            tracing::warn!(comic_id = %id, ?base_dir, "download finished but no folder matched");
            Error::ResolutionMiss {
                id: id.to_string(),
                base_dir,
            }
        })
    }

    async fn package_folder(
        &self,
        id: &ComicId,
        folder: &Path,
        archive_path: &Path,
        password: Option<String>,
    ) -> Result<PackageOutcome> {
        self.emit_event(Event::Packaging { id: id.clone() });

        let inner_name = folder
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(id.as_str())
            .to_string();
        let packager = self.packager.clone();
        let folder = folder.to_path_buf();
        let archive_path = archive_path.to_path_buf();

        self.pool
            .run(move || packager.package(&folder, &archive_path, password.as_deref(), &inner_name))
            .await?
    }
}
