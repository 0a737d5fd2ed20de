// LogCore - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::constants;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Log level
// =============================================================================

/// Severity tag attached to every record.
///
/// Each level owns one bit so module configurations can enable an arbitrary
/// subset (see [`LevelSet`]). `None` has no bit and is never enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    Verbose,
}

impl LogLevel {
    /// Returns all variants in declaration order.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::None,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Fatal,
            LogLevel::Verbose,
        ]
    }

    /// Bit used for this level inside a [`LevelSet`].
    pub const fn bit(self) -> u8 {
        match self {
            LogLevel::None => 0,
            LogLevel::Debug => 1,
            LogLevel::Info => 1 << 1,
            LogLevel::Warning => 1 << 2,
            LogLevel::Error => 1 << 3,
            LogLevel::Fatal => 1 << 4,
            LogLevel::Verbose => 1 << 5,
        }
    }

    /// Upper-case label written into module log files and console lines.
    pub const fn label(self) -> &'static str {
        match self {
            LogLevel::None => "<unknown>",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
            LogLevel::Verbose => "VERBOSE",
        }
    }

    /// Lower-case name used as a key in `log-config.toml`.
    pub const fn config_name(self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Verbose => "verbose",
        }
    }

    /// Case-insensitive lookup by config name. `"warn"` is accepted as an
    /// alias for `warning`.
    pub fn from_config_name(name: &str) -> Option<LogLevel> {
        let lower = name.trim().to_ascii_lowercase();
        if lower == "warn" {
            return Some(LogLevel::Warning);
        }
        LogLevel::all()
            .iter()
            .copied()
            .find(|level| level.config_name() == lower)
    }

    /// ANSI SGR foreground colour sequence used when colours are enabled.
    pub const fn ansi_color(self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[32m",
            LogLevel::Info => "\x1b[94m",
            LogLevel::Warning => "\x1b[33m",
            LogLevel::Error | LogLevel::Fatal => "\x1b[31m",
            LogLevel::Verbose => "\x1b[37m",
            LogLevel::None => "\x1b[39m",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Level set
// =============================================================================

/// Bitmask of enabled levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LevelSet(u8);

impl LevelSet {
    /// No level enabled.
    pub const EMPTY: LevelSet = LevelSet(0);

    /// Build a set from a slice of levels.
    pub fn of(levels: &[LogLevel]) -> Self {
        levels.iter().fold(Self::EMPTY, |set, &level| set.with(level))
    }

    /// Returns a copy with `level` enabled.
    pub const fn with(self, level: LogLevel) -> Self {
        LevelSet(self.0 | level.bit())
    }

    /// `true` if `level` is enabled. `LogLevel::None` is never contained.
    pub const fn contains(self, level: LogLevel) -> bool {
        let bit = level.bit();
        bit != 0 && self.0 & bit == bit
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the enabled levels in declaration order.
    pub fn iter(self) -> impl Iterator<Item = LogLevel> {
        LogLevel::all()
            .iter()
            .copied()
            .filter(move |&level| self.contains(level))
    }
}

impl Serialize for LevelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(LogLevel::config_name))
    }
}

// =============================================================================
// Configuration values
// =============================================================================

/// Per-module logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleConfig {
    /// Levels this module emits; anything else is filtered at the call site.
    pub levels: LevelSet,
    /// Echo every record of this module to the console.
    pub print_to_console: bool,
    /// Append to the module's log file; `false` truncates it on first open.
    pub append: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            levels: LevelSet::of(&[
                LogLevel::Info,
                LogLevel::Warning,
                LogLevel::Error,
                LogLevel::Fatal,
            ]),
            print_to_console: false,
            append: true,
        }
    }
}

/// Per-level settings shared by every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LevelConfig {
    /// Echo every record of this level to the console.
    pub print_to_console: bool,
}

/// Process-wide settings, replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalConfig {
    /// strftime pattern used for record timestamps.
    pub log_time_format: String,
    /// Omit the call-site location from module log lines.
    pub disable_debug_info: bool,
    /// Colour console lines by level.
    pub enable_colors: bool,
    /// Prefix for every log file path, normally ending in a separator.
    pub logs_root_folder: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_time_format: constants::DEFAULT_LOG_TIME_FORMAT.to_string(),
            disable_debug_info: false,
            enable_colors: false,
            logs_root_folder: constants::DEFAULT_LOGS_ROOT_FOLDER.to_string(),
        }
    }
}

/// A complete configuration as produced by the config source.
///
/// Applied to the store in one step; modules absent here fall back to
/// [`ModuleConfig::default`] and levels absent here to
/// [`LevelConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    pub global: GlobalConfig,
    pub levels: BTreeMap<LogLevel, LevelConfig>,
    pub modules: BTreeMap<String, ModuleConfig>,
}

// =============================================================================
// Records
// =============================================================================

/// A fully formatted record ready for delivery.
///
/// The timestamp is rendered on the producer thread so it reflects emit
/// time, not write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub module: String,
    pub message: String,
}

impl LogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        level: LogLevel,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level,
            module: module.into(),
            message: message.into(),
        }
    }
}

/// Call site captured through `#[track_caller]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl From<&'static std::panic::Location<'static>> for SourceLocation {
    fn from(loc: &'static std::panic::Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_set_never_contains_none() {
        let set = LevelSet::of(LogLevel::all());
        assert!(!set.contains(LogLevel::None));
        assert!(set.contains(LogLevel::Verbose));
    }

    #[test]
    fn default_module_config_skips_debug() {
        let config = ModuleConfig::default();
        assert!(!config.levels.contains(LogLevel::Debug));
        assert!(!config.levels.contains(LogLevel::Verbose));
        assert!(config.levels.contains(LogLevel::Info));
        assert!(config.levels.contains(LogLevel::Fatal));
        assert!(config.append);
    }

    #[test]
    fn config_names_round_trip_case_insensitively() {
        for &level in LogLevel::all() {
            let upper = level.config_name().to_uppercase();
            assert_eq!(LogLevel::from_config_name(&upper), Some(level));
        }
        assert_eq!(LogLevel::from_config_name("warn"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_config_name("loud"), None);
    }

    #[test]
    fn level_set_iterates_in_order() {
        let set = LevelSet::of(&[LogLevel::Fatal, LogLevel::Debug]);
        let levels: Vec<_> = set.iter().collect();
        assert_eq!(levels, vec![LogLevel::Debug, LogLevel::Fatal]);
    }

    #[test]
    fn global_defaults() {
        let global = GlobalConfig::default();
        assert_eq!(global.log_time_format, "%x %X");
        assert_eq!(global.logs_root_folder, "logs/");
        assert!(!global.enable_colors);
    }
}
