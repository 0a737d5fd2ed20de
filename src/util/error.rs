// LogCore - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Nothing in the delivery path is fatal to the host process: these errors
// only reach callers that load configuration or talk to a stopped queue.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogCore operations.
#[derive(Debug)]
pub enum LogCoreError {
    /// Configuration source could not be read or parsed.
    Config(ConfigError),

    /// The delivery queue rejected an action or its worker failed.
    Delivery(DeliveryError),
}

impl fmt::Display for LogCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Delivery(e) => write!(f, "Delivery error: {e}"),
        }
    }
}

impl std::error::Error for LogCoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Delivery(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to loading the external configuration source.
///
/// `Io` and `TomlParse` mean "no update applied": the store keeps what it had.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading the config file (including "not found").
    Io { path: PathBuf, source: io::Error },

    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The OS refused to spawn the config watcher thread.
    WatcherSpawn { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::WatcherSpawn { path, source } => {
                write!(f, "Cannot watch config '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::TomlParse { source, .. } => Some(source),
            Self::WatcherSpawn { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for LogCoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Errors related to the log delivery queue.
#[derive(Debug)]
pub enum DeliveryError {
    /// Shutdown has been requested; the action was not accepted.
    Stopped,

    /// The OS refused to spawn the worker thread.
    WorkerSpawn { source: io::Error },

    /// The worker thread terminated by panicking.
    WorkerPanicked,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "delivery queue is stopped"),
            Self::WorkerSpawn { source } => {
                write!(f, "failed to spawn delivery worker: {source}")
            }
            Self::WorkerPanicked => write!(f, "delivery worker panicked"),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WorkerSpawn { source } => Some(source),
            _ => None,
        }
    }
}

impl From<DeliveryError> for LogCoreError {
    fn from(e: DeliveryError) -> Self {
        Self::Delivery(e)
    }
}

/// Convenience type alias for LogCore results.
pub type Result<T> = std::result::Result<T, LogCoreError>;
