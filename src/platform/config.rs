// LogCore - platform/config.rs
//
// log-config.toml loading and validation. This is the external config
// source: it turns a file into a complete `ConfigSnapshot` and never touches
// the store itself.
//
// Invalid individual values produce actionable warnings and fall back to
// defaults. Only an unreadable or unparseable file is an error, and that
// means "no update applied".

use crate::core::model::{
    ConfigSnapshot, GlobalConfig, LevelConfig, LevelSet, LogLevel, ModuleConfig,
};
use crate::core::timestamp::is_valid_time_format;
use crate::util::error::ConfigError;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// Raw file shape
// =============================================================================

/// Raw deserialisable shape of log-config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[global]` section.
    pub global: GlobalSection,
    /// `[levels.<level>]` tables.
    pub levels: BTreeMap<String, LevelSection>,
    /// `[modules.<name>]` tables.
    pub modules: BTreeMap<String, ModuleSection>,
}

/// `[global]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct GlobalSection {
    pub log_time_format: Option<String>,
    pub disable_debug_info: Option<bool>,
    pub enable_colors: Option<bool>,
    pub logs_root_folder: Option<String>,
}

/// `[levels.<level>]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LevelSection {
    pub print_to_console: Option<bool>,
}

/// `[modules.<name>]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ModuleSection {
    /// Level names, e.g. `["info", "warning"]`.
    pub levels: Option<Vec<String>>,
    pub print_to_console: Option<bool>,
    pub append: Option<bool>,
}

// =============================================================================
// Loading
// =============================================================================

/// Read and validate the config file at `path`.
///
/// Returns the snapshot together with non-fatal validation warnings.
pub fn load_config_file(path: &Path) -> Result<(ConfigSnapshot, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;

    let (snapshot, warnings) = validate(raw);

    tracing::info!(
        path = %path.display(),
        modules = snapshot.modules.len(),
        levels = snapshot.levels.len(),
        warnings = warnings.len(),
        "Loaded log config"
    );
    for warning in &warnings {
        tracing::warn!(path = %path.display(), "{}", warning);
    }

    Ok((snapshot, warnings))
}

/// Parse config text that did not come from a file (tests, embedded
/// defaults).
pub fn parse_config(content: &str) -> Result<(ConfigSnapshot, Vec<String>), toml::de::Error> {
    let raw: RawConfig = toml::from_str(content)?;
    Ok(validate(raw))
}

/// Turn the raw shape into a snapshot, accumulating every problem instead of
/// stopping at the first.
pub fn validate(raw: RawConfig) -> (ConfigSnapshot, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut snapshot = ConfigSnapshot {
        global: validate_global(raw.global, &mut warnings),
        ..ConfigSnapshot::default()
    };

    for (name, section) in raw.levels {
        match LogLevel::from_config_name(&name) {
            Some(level) => {
                let mut config = LevelConfig::default();
                if let Some(print) = section.print_to_console {
                    config.print_to_console = print;
                }
                snapshot.levels.insert(level, config);
            }
            None => warnings.push(format!(
                "[levels.{name}] is not a recognised level. \
                 Valid values: debug, info, warning, error, fatal, verbose. Section ignored."
            )),
        }
    }

    for (name, section) in raw.modules {
        let mut config = ModuleConfig::default();

        if let Some(names) = section.levels {
            let mut set = LevelSet::EMPTY;
            for level_name in names {
                match LogLevel::from_config_name(&level_name) {
                    Some(level) => set = set.with(level),
                    None => warnings.push(format!(
                        "[modules.{name}] levels contains unknown level \"{level_name}\". Ignored."
                    )),
                }
            }
            config.levels = set;
        }
        if let Some(print) = section.print_to_console {
            config.print_to_console = print;
        }
        if let Some(append) = section.append {
            config.append = append;
        }

        snapshot.modules.insert(name, config);
    }

    (snapshot, warnings)
}

fn validate_global(section: GlobalSection, warnings: &mut Vec<String>) -> GlobalConfig {
    let mut global = GlobalConfig::default();

    if let Some(format) = section.log_time_format {
        if is_valid_time_format(&format) {
            global.log_time_format = format;
        } else {
            warnings.push(format!(
                "[global] log_time_format = \"{format}\" is not a valid strftime pattern. \
                 Using default (\"{}\").",
                global.log_time_format
            ));
        }
    }
    if let Some(disable) = section.disable_debug_info {
        global.disable_debug_info = disable;
    }
    if let Some(colors) = section.enable_colors {
        global.enable_colors = colors;
    }
    if let Some(root) = section.logs_root_folder {
        global.logs_root_folder = root;
    }

    global
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[global]
log_time_format = "%H:%M:%S"
enable_colors = true
logs_root_folder = "var/log/"

[levels.warning]
print_to_console = true

[modules.net]
levels = ["Warning", "error", "FATAL"]
append = false

[modules.db]
print_to_console = true
"#;

    #[test]
    fn parses_every_section() {
        let (snapshot, warnings) = parse_config(SAMPLE).unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

        assert_eq!(snapshot.global.log_time_format, "%H:%M:%S");
        assert!(snapshot.global.enable_colors);
        assert!(!snapshot.global.disable_debug_info);
        assert_eq!(snapshot.global.logs_root_folder, "var/log/");

        assert!(snapshot.levels[&LogLevel::Warning].print_to_console);

        let net = &snapshot.modules["net"];
        assert!(!net.append);
        assert!(!net.levels.contains(LogLevel::Info));
        assert!(net.levels.contains(LogLevel::Fatal));

        let db = &snapshot.modules["db"];
        assert!(db.print_to_console);
        assert_eq!(db.levels, ModuleConfig::default().levels);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let (snapshot, warnings) = parse_config("").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(snapshot, ConfigSnapshot::default());
    }

    #[test]
    fn bad_values_warn_and_fall_back() {
        let content = r#"
[global]
log_time_format = "%Q"

[levels.loud]
print_to_console = true

[modules.net]
levels = ["info", "chatty"]
"#;
        let (snapshot, warnings) = parse_config(content).unwrap();

        assert_eq!(warnings.len(), 3, "warnings: {warnings:?}");
        assert_eq!(snapshot.global.log_time_format, "%x %X");
        assert!(snapshot.levels.is_empty());
        assert_eq!(
            snapshot.modules["net"].levels,
            LevelSet::of(&[LogLevel::Info])
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("log-config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log-config.toml");
        std::fs::write(&path, "[global\nlog_time_format = ").unwrap();

        let result = load_config_file(&path);
        assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
    }
}
