//! Per-run scratch files.
//!
//! Every intermediate file a composition run produces is registered in a
//! [`TempFileSet`]. The set owns a dedicated `run-<uuid>` directory under the
//! configured work dir; releasing the set deletes every registered file and
//! then the directory itself, whatever the outcome of the run.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MediaResult;

/// Scratch files owned by a single run.
#[derive(Debug)]
pub struct TempFileSet {
    dir: PathBuf,
    files: BTreeSet<PathBuf>,
    released: bool,
}

impl TempFileSet {
    /// Create a fresh run directory under `base`.
    pub async fn create_in(base: impl AsRef<Path>) -> MediaResult<Self> {
        let dir = base
            .as_ref()
            .join(format!("run-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir).await?;

        debug!(dir = %dir.display(), "Created run directory");

        Ok(Self {
            dir,
            files: BTreeSet::new(),
            released: false,
        })
    }

    /// The run directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve `name` inside the run directory and register it for cleanup.
    pub fn path(&mut self, name: &str) -> PathBuf {
        let path = self.dir.join(name);
        self.files.insert(path.clone());
        path
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete a registered file now instead of at release.
    pub async fn remove(&mut self, path: &Path) {
        if self.files.remove(path) {
            remove_file_logged(path).await;
        }
    }

    /// Delete every registered file and the run directory.
    pub async fn release(mut self) {
        let files = std::mem::take(&mut self.files);
        for path in &files {
            remove_file_logged(path).await;
        }

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), "Failed to remove run directory: {}", e),
        }

        debug!(dir = %self.dir.display(), files = files.len(), "Released run directory");
        self.released = true;
    }
}

async fn remove_file_logged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Temp file already gone");
        }
        Err(e) => warn!(path = %path.display(), "Failed to remove temp file: {}", e),
    }
}

impl Drop for TempFileSet {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Reached only when a run unwinds before release.
        for path in &self.files {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "Failed to remove temp file: {}", e),
            }
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), "Failed to remove run directory: {}", e),
        }
    }
}
