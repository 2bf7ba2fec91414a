//! CPU frame compositing.
//!
//! [`compositor::Compositor`] resolves the active scene(s) for a global time and dispatches to
//! one of two layout strategies: [`ken_burns`] (layout v1) or [`elements`] (layout v2).

/// Frame entry point, watermark and master fade.
pub mod compositor;
/// Layout v2 element drawing.
pub mod elements;
/// Layout v1 pan/zoom and captions.
pub mod ken_burns;
/// Output surface and paint conversion helpers.
pub mod surface;
/// Text shaping, wrapping and drawing.
pub mod text;
