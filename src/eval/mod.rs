/// Scene timing and crossfade resolution.
pub mod timeline;
