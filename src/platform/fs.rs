// LogCore - platform/fs.rs
//
// Filesystem abstraction traits.
// Enables testing the file router without counting on real directory
// creation, and keeps the process-wide "already created" cache out of the
// delivery core.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Creates every missing parent directory of a file path.
///
/// Implementations must be idempotent and safe to call repeatedly; any
/// failure is swallowed (the subsequent file open reports it).
pub trait DirectoryEnsurer: Send {
    fn ensure_folders(&self, file_path: &Path);
}

/// Real filesystem implementation with a cache of directories already
/// created, so repeated calls for the same tree are free.
#[derive(Debug, Default)]
pub struct FsDirectoryEnsurer {
    ensured: Mutex<HashSet<PathBuf>>,
}

impl FsDirectoryEnsurer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectoryEnsurer for FsDirectoryEnsurer {
    fn ensure_folders(&self, file_path: &Path) {
        let Some(parent) = file_path.parent() else {
            return;
        };
        if parent.as_os_str().is_empty() {
            return;
        }

        {
            let ensured = self.ensured.lock().unwrap_or_else(PoisonError::into_inner);
            if ensured.contains(parent) {
                return;
            }
        }

        match std::fs::create_dir_all(parent) {
            Ok(()) => {
                tracing::debug!(dir = %parent.display(), "Log directory ensured");
                self.ensured
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(parent.to_path_buf());
            }
            Err(e) => {
                // Not cached: the next path change retries.
                tracing::warn!(
                    dir = %parent.display(),
                    error = %e,
                    "Failed to create log directory"
                );
            }
        }
    }
}
