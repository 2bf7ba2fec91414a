//! Decoded images, audio and fonts, and the loader that fills the store from disk.

/// Image and audio decoding.
pub mod decode;
/// Asset Store and batch loading.
pub mod store;
