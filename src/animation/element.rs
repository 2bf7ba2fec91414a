//! Per-element entrance/exit evaluation.
//!
//! Everything here is a pure function of the element timing and the scene-local time, so the
//! preview and export paths see identical animation state for the same instant.

use kurbo::Size;

use crate::animation::ease::Ease;
use crate::foundation::core::{Affine, Rect, Vec2};
use crate::script::model::{Entrance, EntranceKind, Exit, ExitKind};

/// Maximum rotation swept by `rotate-in` / `rotate-out`, in degrees.
pub const ROTATE_SWEEP_DEG: f64 = 45.0;
/// Starting magnification of `zoom-in`.
pub const ZOOM_IN_FROM: f64 = 0.6;
/// Starting magnification of `zoom-out`.
pub const ZOOM_OUT_FROM: f64 = 1.4;

/// Animated state of one element at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementState {
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Offset of the element box in pixels.
    pub offset: Vec2,
    /// Uniform scale about the box center.
    pub scale: f64,
    /// Rotation about the box center, in degrees.
    pub rotation_deg: f64,
    /// Image-only magnification inside the box (1.0 = none).
    pub zoom: f64,
}

impl Default for ElementState {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            offset: Vec2::ZERO,
            scale: 1.0,
            rotation_deg: 0.0,
            zoom: 1.0,
        }
    }
}

impl ElementState {
    /// Transform that maps the element's rest box to its animated placement.
    pub fn transform(&self, bbox: Rect) -> Affine {
        let center = bbox.center().to_vec2();
        Affine::translate(self.offset)
            * Affine::translate(center)
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale(self.scale)
            * Affine::translate(-center)
    }

    /// `true` when drawing would produce nothing.
    pub fn is_degenerate(&self) -> bool {
        self.opacity <= 0.0 || self.scale <= 0.0
    }
}

/// Linear progress of a `[start, start + duration]` window at `t`, clamped to `[0, 1]`.
///
/// A zero-length window steps from 0 to 1 at `start`.
pub fn window_progress(start: f64, duration: f64, t: f64) -> f64 {
    if duration <= 0.0 {
        return if t >= start { 1.0 } else { 0.0 };
    }
    crate::foundation::math::unit_clamp((t - start) / duration)
}

/// Evaluate an element at scene-local time `t`.
///
/// Returns `None` before the entrance has started and after the exit has finished. While both
/// windows are active, opacity factors multiply and the exit's offset/scale/rotation replace the
/// entrance's values.
pub fn evaluate(
    entrance: &Entrance,
    exit: Option<&Exit>,
    t: f64,
    size: Size,
) -> Option<ElementState> {
    let p = window_progress(entrance.start, entrance.duration, t);
    if p <= 0.0 {
        return None;
    }
    let e = Ease::InOutCubic.apply(p);
    let rest = 1.0 - e;

    let mut st = ElementState::default();
    match entrance.kind {
        EntranceKind::None => {}
        EntranceKind::FadeIn => st.opacity = e,
        EntranceKind::SlideInLeft => st.offset = Vec2::new(-rest * size.width, 0.0),
        EntranceKind::SlideInRight => st.offset = Vec2::new(rest * size.width, 0.0),
        EntranceKind::SlideInTop => st.offset = Vec2::new(0.0, -rest * size.height),
        EntranceKind::SlideInBottom => st.offset = Vec2::new(0.0, rest * size.height),
        EntranceKind::ZoomIn => st.zoom = ZOOM_IN_FROM + (1.0 - ZOOM_IN_FROM) * e,
        EntranceKind::ZoomOut => st.zoom = ZOOM_OUT_FROM + (1.0 - ZOOM_OUT_FROM) * e,
        EntranceKind::ScaleUp => st.scale = e,
        EntranceKind::RotateIn => st.rotation_deg = -ROTATE_SWEEP_DEG * rest,
    }

    let Some(exit) = exit else {
        return Some(st);
    };
    let q = window_progress(exit.start, exit.duration, t);
    if q >= 1.0 {
        return None;
    }
    if q > 0.0 {
        let x = Ease::InOutCubic.apply(q);
        match exit.kind {
            ExitKind::FadeOut => st.opacity *= 1.0 - x,
            ExitKind::SlideOutLeft => st.offset = Vec2::new(-x * size.width, 0.0),
            ExitKind::SlideOutRight => st.offset = Vec2::new(x * size.width, 0.0),
            ExitKind::SlideOutTop => st.offset = Vec2::new(0.0, -x * size.height),
            ExitKind::SlideOutBottom => st.offset = Vec2::new(0.0, x * size.height),
            ExitKind::ScaleDown => st.scale = 1.0 - x,
            ExitKind::RotateOut => st.rotation_deg = ROTATE_SWEEP_DEG * x,
        }
    }
    Some(st)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/element.rs"]
mod tests;
