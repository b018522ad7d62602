//! Collision-free placement of finished downloads.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::NamedTempFile;

/// Serializes "pick a free name, rename into it" across jobs. Every job
/// started by one supervisor shares the same lock; independent supervisors
/// (and tests) get independent locks.
#[derive(Debug, Clone, Default)]
pub struct PlacementLock {
    inner: Arc<Mutex<()>>,
}

impl PlacementLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the placement critical section. Jobs that finish while the guard
    /// lives block before choosing their final name.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// First path among `requested`, `stem_0.ext`, `stem_1.ext`, ... that does not exist.
pub fn free_path(requested: &Path) -> PathBuf {
    if !requested.exists() {
        return requested.to_path_buf();
    }
    let stem = requested
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = requested
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (0u64..)
        .map(|i| requested.with_file_name(format!("{stem}_{i}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| requested.to_path_buf())
}

/// Move a staged temp file to `requested` or a free sibling name, under `lock`.
/// Returns the path the file was saved at.
pub fn place(
    temp: NamedTempFile,
    requested: &Path,
    lock: &PlacementLock,
) -> Result<PathBuf, tempfile::PersistError> {
    let _guard = lock.lock();
    let target = free_path(requested);
    temp.persist(&target)?;
    if target != requested {
        tracing::debug!(
            requested = %requested.display(),
            saved = %target.display(),
            "destination taken, saved under sibling name"
        );
    }
    Ok(target)
}
