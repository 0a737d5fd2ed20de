// LogCore - lib.rs
//
// Library entry point. Callers normally need only `LogContext` and the
// `Logger` handles it creates; the layers stay public for integration
// testing and for hosts that drive the store or queue directly.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use crate::app::context::LogContext;
pub use crate::app::logger::Logger;
pub use crate::core::model::{GlobalConfig, LevelConfig, LevelSet, LogLevel, ModuleConfig};
pub use crate::util::error::{LogCoreError, Result};
