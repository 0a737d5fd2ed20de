// LogCore - app/mod.rs
//
// Application layer: config store, delivery worker, file routing and the
// handles callers use to emit records.
// Dependencies: core, platform, util.

pub mod config_store;
pub mod config_watcher;
pub mod context;
pub mod delivery;
pub mod logger;
pub mod router;
