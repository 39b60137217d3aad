//! Temporary audio artifacts and their lifecycle
//!
//! Every artifact is removed from disk exactly once: either through
//! [`ArtifactStore::release`] or, failing that, when the handle is dropped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// File name prefix for synthesized audio
const ARTIFACT_PREFIX: &str = "speech_";

/// Shared bookkeeping for allocated artifacts
#[derive(Debug, Default)]
struct Ledger {
    allocated: AtomicUsize,
    released: AtomicUsize,
    live: Mutex<HashSet<String>>,
}

impl Ledger {
    fn claim(&self, id: &str) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string())
    }

    fn forget(&self, id: &str) {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Handle to a synthesized (or about to be synthesized) audio file
#[derive(Debug)]
pub struct Artifact {
    id: String,
    path: PathBuf,
    ready: bool,
    ledger: Arc<Ledger>,
}

impl Artifact {
    /// Unique identifier within the store
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Location the audio is written to and played from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether synthesis finished successfully for this artifact
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) const fn mark_ready(&mut self) {
        self.ready = true;
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    artifact = %self.id,
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove speech artifact"
                );
            }
        }
        self.ledger.forget(&self.id);
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Allocates uniquely named artifact files under one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    ledger: Arc<Ledger>,
}

impl ArtifactStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ledger: Arc::default(),
        })
    }

    /// Directory artifacts are created in
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh artifact location
    ///
    /// Nothing is written; the synthesizer creates the file.
    #[must_use]
    pub fn allocate(&self) -> Artifact {
        let id = loop {
            let candidate = uuid::Uuid::new_v4().simple().to_string();
            if self.ledger.claim(&candidate) {
                break candidate;
            }
        };
        self.ledger.allocated.fetch_add(1, Ordering::SeqCst);

        let path = self.dir.join(format!("{ARTIFACT_PREFIX}{id}.wav"));
        tracing::trace!(artifact = %id, path = %path.display(), "allocated artifact");

        Artifact {
            id,
            path,
            ready: false,
            ledger: Arc::clone(&self.ledger),
        }
    }

    /// Destroy an artifact and its backing file
    #[allow(clippy::needless_pass_by_value, clippy::unused_self)]
    pub fn release(&self, artifact: Artifact) {
        tracing::trace!(artifact = %artifact.id, "releasing artifact");
        drop(artifact);
    }

    /// Number of artifacts handed out so far
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.ledger.allocated.load(Ordering::SeqCst)
    }

    /// Number of artifacts destroyed so far
    #[must_use]
    pub fn released(&self) -> usize {
        self.ledger.released.load(Ordering::SeqCst)
    }

    /// Number of artifacts currently alive
    #[must_use]
    pub fn live(&self) -> usize {
        self.ledger
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("speech")).unwrap();
        (dir, store)
    }

    #[test]
    fn creates_missing_directory() {
        let (_dir, store) = store();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn allocations_are_unique_and_not_ready() {
        let (_dir, store) = store();
        let a = store.allocate();
        let b = store.allocate();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.path(), b.path());
        assert!(!a.is_ready());
        assert!(a.path().starts_with(store.dir()));
        assert_eq!(a.path().extension().unwrap(), "wav");
        assert_eq!(store.live(), 2);
    }

    #[test]
    fn release_removes_file_and_balances_ledger() {
        let (_dir, store) = store();
        let artifact = store.allocate();
        std::fs::write(artifact.path(), b"RIFF").unwrap();
        let path = artifact.path().to_path_buf();

        store.release(artifact);

        assert!(!path.exists());
        assert_eq!(store.allocated(), 1);
        assert_eq!(store.released(), 1);
        assert_eq!(store.live(), 0);
    }

    #[test]
    fn releasing_unwritten_artifact_is_fine() {
        let (_dir, store) = store();
        let artifact = store.allocate();
        store.release(artifact);
        assert_eq!(store.released(), 1);
    }

    #[test]
    fn dropped_artifact_is_cleaned_up() {
        let (_dir, store) = store();
        let path = {
            let artifact = store.allocate();
            std::fs::write(artifact.path(), b"RIFF").unwrap();
            artifact.path().to_path_buf()
        };

        assert!(!path.exists());
        assert_eq!(store.live(), 0);
        assert_eq!(store.allocated(), store.released());
    }
}
