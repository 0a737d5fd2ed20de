// LogCore - app/context.rs
//
// Explicit owner of the shared logging state: one config store and one
// delivery queue. Everything else (loggers, watchers) borrows these through
// `Arc` clones handed out here.
//
// Teardown is explicit: `shutdown` drains and stops the queue. Loggers that
// outlive it get `DeliveryError::Stopped` instead of writing.

use crate::app::config_store::{ConfigStore, ReloadSummary};
use crate::app::config_watcher::ConfigWatcher;
use crate::app::delivery::DeliveryQueue;
use crate::app::logger::Logger;
use crate::platform::config;
use crate::util::constants::CONFIG_WATCH_POLL_INTERVAL_MS;
use crate::util::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Store plus delivery queue, shared by every logger created from it.
pub struct LogContext {
    store: Arc<ConfigStore>,
    queue: Arc<DeliveryQueue>,
}

impl LogContext {
    /// Context with an empty store and a running delivery worker.
    pub fn new() -> Result<Self> {
        Self::with_store(Arc::new(ConfigStore::new()))
    }

    /// Context around an existing store.
    pub fn with_store(store: Arc<ConfigStore>) -> Result<Self> {
        let queue = DeliveryQueue::new(Arc::clone(&store))?;
        Ok(Self {
            store,
            queue: Arc::new(queue),
        })
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    /// Logger for `module`, subscribed to this context's store.
    pub fn logger(&self, module: impl Into<String>) -> Logger {
        Logger::new(Arc::clone(&self.store), Arc::clone(&self.queue), module)
    }

    /// Load `path` and apply it to the store.
    ///
    /// On error nothing is applied. Validation warnings are returned
    /// alongside the summary and have already been logged.
    pub fn load_config_file(&self, path: &Path) -> Result<(ReloadSummary, Vec<String>)> {
        let (snapshot, warnings) = config::load_config_file(path)?;
        let summary = self.store.reload(snapshot);
        tracing::debug!(
            path = %path.display(),
            modules = summary.modules,
            removed = summary.removed,
            notified = summary.notified,
            "Config applied"
        );
        Ok((summary, warnings))
    }

    /// Reload the store whenever `path` changes.
    pub fn watch_config(&self, path: &Path) -> Result<ConfigWatcher> {
        self.watch_config_every(path, CONFIG_WATCH_POLL_INTERVAL_MS)
    }

    /// [`watch_config`](Self::watch_config) with a custom poll interval.
    pub fn watch_config_every(&self, path: &Path, poll_interval_ms: u64) -> Result<ConfigWatcher> {
        let watcher = ConfigWatcher::start(path, Arc::clone(&self.store), poll_interval_ms)?;
        Ok(watcher)
    }

    /// Block until everything queued so far has been written.
    pub fn flush(&self) -> Result<()> {
        self.queue.flush()?;
        Ok(())
    }

    /// Drain the queue and stop the worker. Returns `false` if already
    /// stopped.
    pub fn shutdown(&self) -> Result<bool> {
        Ok(self.queue.shutdown()?)
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        if let Err(e) = self.queue.shutdown() {
            tracing::warn!(error = %e, "Delivery shutdown failed");
        }
    }
}
