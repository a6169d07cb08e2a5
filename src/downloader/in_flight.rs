//! Per-identifier exclusion for active requests.

use crate::error::{Error, Result};
use crate::types::ComicId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifiers currently being downloaded or packaged
///
/// Owned by one downloader instance and shared by its clones. An identifier is
/// a member exactly as long as an [`InFlightGuard`] for it is alive.
#[derive(Clone, Debug, Default)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<ComicId>>>,
}

impl InFlightSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in flight, or fail immediately if it already is
    ///
    /// Concurrent requests for the same id are rejected, never queued.
    pub fn try_acquire(&self, id: &ComicId) -> Result<InFlightGuard> {
        if !self.lock().insert(id.clone()) {
            return Err(Error::AlreadyInFlight(id.to_string()));
        }
        tracing::debug!(comic_id = %id, "marked in flight");
        Ok(InFlightGuard {
            set: self.clone(),
            id: id.clone(),
        })
    }

    /// Whether `id` is currently in flight
    pub fn contains(&self, id: &ComicId) -> bool {
        self.lock().contains(id)
    }

    /// Number of identifiers in flight
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the set half-updated
    fn lock(&self) -> MutexGuard<'_, HashSet<ComicId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Membership of one identifier in an [`InFlightSet`], released on drop
#[must_use = "the identifier is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct InFlightGuard {
    set: InFlightSet,
    id: ComicId,
}

impl InFlightGuard {
    /// The guarded identifier
    pub fn id(&self) -> &ComicId {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
        tracing::debug!(comic_id = %self.id, "released from in flight");
    }
}
