// LogCore - platform/mod.rs
//
// Platform abstraction layer: the config-file source and filesystem
// helpers the delivery core treats as black boxes.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
