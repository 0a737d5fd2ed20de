// LogCore - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogCore";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` filter for the binary when neither `RUST_LOG` nor
/// `--debug` is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration defaults
// =============================================================================

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "log-config.toml";

/// Default strftime pattern for record timestamps (locale date + time).
pub const DEFAULT_LOG_TIME_FORMAT: &str = "%x %X";

/// Default folder prefix for all log files. Concatenated, not joined, with
/// the file name, so it keeps its trailing separator.
pub const DEFAULT_LOGS_ROOT_FOLDER: &str = "logs/";

// =============================================================================
// Level file names
// =============================================================================

/// Target file for WARNING records.
pub const WARNINGS_FILE_NAME: &str = "warnings.log";

/// Target file for ERROR records.
pub const ERRORS_FILE_NAME: &str = "errors.log";

/// Target file for FATAL records.
pub const FATALS_FILE_NAME: &str = "fatals.log";

/// Extension appended to a module name to form its own log file.
pub const MODULE_FILE_EXTENSION: &str = ".log";

// =============================================================================
// Delivery worker
// =============================================================================

/// Thread name of the single delivery worker.
pub const DELIVERY_THREAD_NAME: &str = "logcore-delivery";

// =============================================================================
// Config watcher
// =============================================================================

/// How often the config watcher checks the file's modification time (ms).
pub const CONFIG_WATCH_POLL_INTERVAL_MS: u64 = 1_000;

/// How often the cancel flag is checked within each watcher sleep (ms).
pub const CONFIG_WATCH_CANCEL_CHECK_INTERVAL_MS: u64 = 100;

/// Thread name of the config watcher.
pub const CONFIG_WATCH_THREAD_NAME: &str = "logcore-config-watch";
