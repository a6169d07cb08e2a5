//! Bounded pool for blocking work (album downloads and compression).

use crate::error::{DownloadError, Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Upper bound on concurrently running blocking jobs
pub const MAX_WORKER_THREADS: usize = 4;

/// Runs blocking jobs on tokio's blocking threads, at most `size` at a time
#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool; `size` is clamped to `1..=MAX_WORKER_THREADS`
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, MAX_WORKER_THREADS);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Number of jobs that may run at once
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of free worker slots
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queue `job` and return a handle to its result
    ///
    /// The slot is held until the job returns, even if the handle is dropped.
    pub fn spawn<F, T>(&self, job: F) -> JoinHandle<Result<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(worker_failed)?;
            tokio::task::spawn_blocking(job).await.map_err(worker_failed)
        })
    }

    /// Run `job` on the pool and wait for it
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(job).await.map_err(worker_failed)?
    }
}

pub(crate) fn worker_failed(e: impl std::fmt::Display) -> Error {
    DownloadError::WorkerFailed {
        reason: e.to_string(),
    }
    .into()
}
