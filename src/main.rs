// LogCore - main.rs
//
// Command-line front end. Handles:
// 1. CLI argument parsing
// 2. Diagnostics initialisation (debug mode support)
// 3. Config loading (explicit path, or log-config.toml when present)
// 4. Emitting one record per message, then draining the queue

use clap::Parser;
use logcore::util::constants::{APP_VERSION, CONFIG_FILE_NAME};
use logcore::util::logging;
use logcore::{LogContext, LogLevel};
use std::error::Error;
use std::path::PathBuf;

/// LogCore - write log records through the asynchronous delivery core.
///
/// Records land in `<logs_root_folder><module>.log`; warnings, errors and
/// fatals are also appended to their level files.
#[derive(Parser, Debug)]
#[command(name = "logcore", version, about)]
struct Cli {
    /// Config file (defaults to log-config.toml in the working directory, if present).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug diagnostics (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long = "show-config")]
    show_config: bool,

    /// Module the records belong to.
    #[arg(short = 'm', long = "module", required_unless_present = "show_config")]
    module: Option<String>,

    /// Record level: debug, info, warning, error, fatal or verbose.
    #[arg(short = 'l', long = "level", default_value = "info", value_parser = parse_level)]
    level: LogLevel,

    /// Messages to emit, one record each.
    #[arg(required_unless_present = "show_config")]
    messages: Vec<String>,
}

fn parse_level(name: &str) -> Result<LogLevel, String> {
    match LogLevel::from_config_name(name) {
        Some(LogLevel::None) | None => Err(format!(
            "unknown level '{name}' (expected debug, info, warning, error, fatal or verbose)"
        )),
        Some(level) => Ok(level),
    }
}

fn main() {
    let cli = Cli::parse();

    logging::init(cli.debug);

    tracing::debug!(version = APP_VERSION, debug = cli.debug, "LogCore starting");

    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "LogCore failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let ctx = LogContext::new()?;

    // An explicit --config must exist; the default file is optional.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if cli.config.is_some() || config_path.exists() {
        ctx.load_config_file(&config_path)?;
    } else {
        tracing::debug!(path = %config_path.display(), "No config file; using defaults");
    }

    if cli.show_config {
        print!("{}", toml::to_string_pretty(&ctx.store().snapshot())?);
        return Ok(());
    }

    let Some(module) = cli.module.as_deref() else {
        return Ok(());
    };
    let logger = ctx.logger(module);

    let mut emitted = 0usize;
    for message in &cli.messages {
        if logger.log(cli.level, message.as_str())? {
            emitted += 1;
        }
    }
    drop(logger);
    ctx.shutdown()?;

    tracing::info!(
        module,
        level = %cli.level,
        emitted,
        filtered = cli.messages.len() - emitted,
        "Records delivered"
    );
    Ok(())
}
