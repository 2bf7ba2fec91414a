//! Scene scripts: the declarative input the engine renders.

/// Text colors.
pub mod color;
/// Scenes, elements, layouts and asset sources.
pub mod model;
