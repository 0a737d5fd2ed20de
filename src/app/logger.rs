// LogCore - app/logger.rs
//
// Per-module logging handle. A `Logger` subscribes to the config store on
// creation and keeps a cached copy of its module's config, refreshed by the
// store's push notifications. `log` filters against that cache, renders the
// timestamp on the calling thread, and hands the actual writes to the
// delivery queue.
//
// Lock order: the store callback takes the cache lock while the store lock
// is held. `log` therefore never holds the cache lock while calling into the
// store.

use crate::app::config_store::{ConfigStore, SubscriptionId};
use crate::app::delivery::{DeliveryAction, DeliveryQueue};
use crate::app::router::has_level_file;
use crate::core::model::{LogLevel, LogRecord, ModuleConfig, SourceLocation};
use crate::core::timestamp;
use crate::util::error::DeliveryError;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock};

const ANSI_RESET: &str = "\x1b[0m";

/// Logging handle for one module.
///
/// Only one live subscription exists per module name: creating a second
/// logger for the same module takes over the subscription. Dropping the
/// older logger afterwards leaves the newer one subscribed.
pub struct Logger {
    module: String,
    subscription: SubscriptionId,
    config: Arc<RwLock<ModuleConfig>>,
    store: Arc<ConfigStore>,
    queue: Arc<DeliveryQueue>,
}

impl Logger {
    /// Create a logger for `module` and subscribe it to config updates.
    ///
    /// If the store already holds a config for `module` it is applied before
    /// this returns; otherwise the logger starts from
    /// [`ModuleConfig::default`].
    pub fn new(
        store: Arc<ConfigStore>,
        queue: Arc<DeliveryQueue>,
        module: impl Into<String>,
    ) -> Self {
        let module = module.into();
        let config = Arc::new(RwLock::new(ModuleConfig::default()));

        let cache = Arc::clone(&config);
        let subscription = store.subscribe(&module, move |updated: &ModuleConfig| {
            *cache.write().unwrap_or_else(PoisonError::into_inner) = updated.clone();
        });

        Self {
            module,
            subscription,
            config,
            store,
            queue,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Copy of the cached module config.
    pub fn config(&self) -> ModuleConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `true` if records at `level` pass this module's filter.
    pub fn is_log_level(&self, level: LogLevel) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .levels
            .contains(level)
    }

    /// Emit `message` at `level`.
    ///
    /// Returns `Ok(false)` when the level is filtered out, `Ok(true)` once the
    /// writes are queued, and [`DeliveryError::Stopped`] after shutdown. The
    /// console line, level record and module record are queued together or
    /// not at all.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<bool, DeliveryError> {
        let location = SourceLocation::from(Location::caller());
        if !self.is_log_level(level) {
            return Ok(false);
        }

        let config = self.config();
        let global = self.store.global_config();
        let level_config = self.store.level_config(level);

        let record = LogRecord::new(
            timestamp::now(&global.log_time_format),
            level,
            self.module.as_str(),
            message,
        );

        // One batch, so shutdown never splits a record across its targets.
        let mut actions = Vec::with_capacity(3);
        if config.print_to_console || level_config.print_to_console {
            actions.push(DeliveryAction::Console {
                line: console_line(&record, global.enable_colors),
                to_stderr: matches!(level, LogLevel::Error | LogLevel::Fatal),
            });
        }
        if has_level_file(level) {
            actions.push(DeliveryAction::LevelRecord(record.clone()));
        }
        actions.push(DeliveryAction::ModuleRecord {
            record,
            append: config.append,
            location: Some(location),
        });
        self.queue.enqueue_all(actions)?;

        Ok(true)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> Result<bool, DeliveryError> {
        self.log(LogLevel::Debug, message)
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> Result<bool, DeliveryError> {
        self.log(LogLevel::Info, message)
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) -> Result<bool, DeliveryError> {
        self.log(LogLevel::Warning, message)
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> Result<bool, DeliveryError> {
        self.log(LogLevel::Error, message)
    }

    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) -> Result<bool, DeliveryError> {
        self.log(LogLevel::Fatal, message)
    }

    #[track_caller]
    pub fn verbose(&self, message: impl Into<String>) -> Result<bool, DeliveryError> {
        self.log(LogLevel::Verbose, message)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.store.unsubscribe(&self.module, self.subscription);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("module", &self.module)
            .field("config", &self.config())
            .finish()
    }
}

/// `[time] [module] [LEVEL] message`, with the level tag coloured on request.
fn console_line(record: &LogRecord, colors: bool) -> String {
    if colors {
        format!(
            "[{}] [{}] {}[{}]{} {}",
            record.timestamp,
            record.module,
            record.level.ansi_color(),
            record.level.label(),
            ANSI_RESET,
            record.message
        )
    } else {
        format!(
            "[{}] [{}] [{}] {}",
            record.timestamp,
            record.module,
            record.level.label(),
            record.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{GlobalConfig, LevelSet};
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Arc<ConfigStore>, Arc<DeliveryQueue>) {
        let store = Arc::new(ConfigStore::new());
        store.set_global_config(GlobalConfig {
            logs_root_folder: format!("{}/", dir.path().display()),
            log_time_format: "T".to_string(),
            ..GlobalConfig::default()
        });
        let queue = Arc::new(DeliveryQueue::new(Arc::clone(&store)).unwrap());
        (store, queue)
    }

    #[test]
    fn picks_up_existing_config_on_creation() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let verbose_only = ModuleConfig {
            levels: LevelSet::of(&[LogLevel::Verbose]),
            ..ModuleConfig::default()
        };
        store.set_module_config("net", verbose_only.clone());

        let logger = Logger::new(Arc::clone(&store), queue, "net");

        assert_eq!(logger.config(), verbose_only);
        assert!(logger.is_log_level(LogLevel::Verbose));
        assert!(!logger.is_log_level(LogLevel::Info));
    }

    #[test]
    fn follows_live_updates_and_unsubscribes_on_drop() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let logger = Logger::new(Arc::clone(&store), queue, "net");
        assert!(!logger.is_log_level(LogLevel::Debug));

        store.set_module_config(
            "net",
            ModuleConfig {
                levels: LevelSet::of(&[LogLevel::Debug]),
                ..ModuleConfig::default()
            },
        );
        assert!(logger.is_log_level(LogLevel::Debug));

        assert_eq!(store.subscriber_count(), 1);
        drop(logger);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn dropping_replaced_logger_keeps_newer_subscription() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let old = Logger::new(Arc::clone(&store), Arc::clone(&queue), "net");
        let new = Logger::new(Arc::clone(&store), queue, "net");

        drop(old);
        assert_eq!(store.subscriber_count(), 1);

        store.set_module_config(
            "net",
            ModuleConfig {
                levels: LevelSet::of(&[LogLevel::Debug]),
                ..ModuleConfig::default()
            },
        );
        assert!(new.is_log_level(LogLevel::Debug));

        drop(new);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn filtered_level_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let logger = Logger::new(store, Arc::clone(&queue), "net");

        assert!(!logger.debug("hidden").unwrap());
        queue.flush().unwrap();

        assert!(!tmp.path().join("net.log").exists());
    }

    #[test]
    fn warning_goes_to_module_and_level_files() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let logger = Logger::new(store, Arc::clone(&queue), "net");

        let line = line!() + 1;
        assert!(logger.warning("timeout").unwrap());
        queue.flush().unwrap();

        let level_file = std::fs::read_to_string(tmp.path().join("warnings.log")).unwrap();
        assert_eq!(level_file, "[T] [net] timeout\n");

        let module_file = std::fs::read_to_string(tmp.path().join("net.log")).unwrap();
        assert_eq!(
            module_file,
            format!("[T] [WARNING] timeout ({}:{line})\n", file!())
        );
    }

    #[test]
    fn info_skips_level_files() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let logger = Logger::new(store, Arc::clone(&queue), "db");

        logger.info("ready").unwrap();
        queue.flush().unwrap();

        assert!(tmp.path().join("db.log").exists());
        assert!(!tmp.path().join("warnings.log").exists());
        assert!(!tmp.path().join("errors.log").exists());
    }

    #[test]
    fn log_after_shutdown_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        let logger = Logger::new(store, Arc::clone(&queue), "net");

        queue.shutdown().unwrap();
        assert!(matches!(logger.error("late"), Err(DeliveryError::Stopped)));
        assert!(!tmp.path().join("errors.log").exists());
        assert!(!tmp.path().join("net.log").exists());
    }

    #[test]
    fn record_targets_are_queued_back_to_back() {
        let tmp = TempDir::new().unwrap();
        let (store, queue) = setup(&tmp);
        store.set_module_config(
            "net",
            ModuleConfig {
                print_to_console: true,
                ..ModuleConfig::default()
            },
        );
        let logger = Logger::new(store, Arc::clone(&queue), "net");

        assert_eq!(queue.run(|_| {}).unwrap(), 0);
        logger.warning("console, level and module").unwrap();
        assert_eq!(queue.run(|_| {}).unwrap(), 4);
    }

    #[test]
    fn console_line_colours_only_the_level_tag() {
        let record = LogRecord::new("T", LogLevel::Error, "net", "boom");
        assert_eq!(console_line(&record, false), "[T] [net] [ERROR] boom");
        assert_eq!(
            console_line(&record, true),
            "[T] [net] \x1b[31m[ERROR]\x1b[0m boom"
        );
    }
}
