// LogCore - core/mod.rs
//
// Core data model layer.
// Dependencies: standard library, chrono, serde.
// Must NOT depend on: platform or app, and performs no I/O.

pub mod model;
pub mod timestamp;
