//! Shared primitives: geometry and timing types, errors, configuration.

/// Canvas, frame-rate and color primitives.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod math;
/// Engine configuration and the context passed to every component.
pub mod config;
