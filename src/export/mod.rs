/// Offline frame-locked export.
pub mod pipeline;
