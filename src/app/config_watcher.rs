// LogCore - app/config_watcher.rs
//
// Config file watcher: polls the config file on a background thread and
// applies it to the store whenever it changes.
//
// Architecture:
//   - `ConfigWatcher` is owned by the caller; `run_config_watcher` executes
//     on a named background thread.
//   - An `Arc<AtomicBool>` cancel flag stops the thread; `stop` also joins it.
//   - A change is detected by comparing (mtime, length) between polls.
//   - A file that fails to load is logged and skipped. The store keeps its
//     current state until a later version parses.
//   - The poll loop sleeps in sub-intervals so cancel is checked promptly.

use crate::app::config_store::ConfigStore;
use crate::platform::config::load_config_file;
use crate::util::constants::{CONFIG_WATCH_CANCEL_CHECK_INTERVAL_MS, CONFIG_WATCH_THREAD_NAME};
use crate::util::error::ConfigError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// What a poll compares to decide the file changed.
type Fingerprint = Option<(SystemTime, u64)>;

/// Background watcher that reloads the store from a config file.
pub struct ConfigWatcher {
    path: PathBuf,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Start watching `path`, checking it every `poll_interval_ms`.
    ///
    /// The file's state at start is the baseline: only later changes are
    /// applied. Load it once beforehand if the store should reflect it now.
    pub fn start(
        path: impl Into<PathBuf>,
        store: Arc<ConfigStore>,
        poll_interval_ms: u64,
    ) -> Result<Self, ConfigError> {
        let path = path.into();
        let cancel = Arc::new(AtomicBool::new(false));

        let thread_path = path.clone();
        let thread_cancel = Arc::clone(&cancel);
        let handle = std::thread::Builder::new()
            .name(CONFIG_WATCH_THREAD_NAME.to_string())
            .spawn(move || {
                run_config_watcher(thread_path, store, poll_interval_ms, thread_cancel);
            })
            .map_err(|source| ConfigError::WatcherSpawn {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), poll_interval_ms, "Config watcher started");

        Ok(Self {
            path,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` while the watcher thread is running.
    pub fn is_active(&self) -> bool {
        self.handle.is_some() && !self.cancel.load(Ordering::Relaxed)
    }

    /// Signal the thread to stop and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(path = %self.path.display(), "Config watcher thread panicked");
            }
            tracing::debug!(path = %self.path.display(), "Config watcher stopped");
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn fingerprint(path: &Path) -> Fingerprint {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

/// Entry point for the watcher thread.
fn run_config_watcher(
    path: PathBuf,
    store: Arc<ConfigStore>,
    poll_interval_ms: u64,
    cancel: Arc<AtomicBool>,
) {
    let slice_ms = poll_interval_ms.clamp(1, CONFIG_WATCH_CANCEL_CHECK_INTERVAL_MS);
    let slice = Duration::from_millis(slice_ms);
    let slices_per_poll = (poll_interval_ms / slice_ms).max(1);

    let mut last = fingerprint(&path);

    'poll: loop {
        for _ in 0..slices_per_poll {
            if cancel.load(Ordering::Relaxed) {
                break 'poll;
            }
            std::thread::sleep(slice);
        }
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        let current = fingerprint(&path);
        if current == last {
            continue;
        }
        last = current;
        if current.is_none() {
            tracing::debug!(path = %path.display(), "Config file disappeared; keeping current config");
            continue;
        }

        match load_config_file(&path) {
            Ok((snapshot, _warnings)) => {
                let summary = store.reload(snapshot);
                tracing::info!(
                    path = %path.display(),
                    modules = summary.modules,
                    removed = summary.removed,
                    notified = summary.notified,
                    "Config reloaded"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Config change ignored; keeping current config");
            }
        }
    }
}
