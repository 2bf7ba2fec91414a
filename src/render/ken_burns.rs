//! Layout v1: one full-frame photo per scene with pan/zoom motion and a word-revealing caption.

use crate::animation::ease::Ease;
use crate::foundation::core::{Affine, Canvas, Rect};
use crate::foundation::error::ReelResult;
use crate::render::compositor::{FrameCtx, RenderMode};
use crate::render::surface::{affine_to_cpu, color_to_cpu, rect_to_cpu};
use crate::render::text::{BlockStyle, draw_block};
use crate::script::color::RgbaColor;
use crate::script::model::{Scene, SceneLayout, TextAlign};

/// Maximum Ken Burns magnification.
pub const MAX_ZOOM: f64 = 1.15;
/// Pan travel on each side, as a fraction of the canvas size.
pub const PAN_FRACTION: f64 = 0.05;

/// Pan/zoom motion applied to a v1 scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KenBurns {
    /// Magnify from 1.0 to 1.15.
    ZoomIn,
    /// Magnify from 1.15 down to 1.0.
    ZoomOut,
    /// Drift the picture leftward.
    PanLeft,
    /// Drift the picture rightward.
    PanRight,
    /// Drift the picture upward.
    PanUp,
    /// Drift the picture downward.
    PanDown,
}

impl KenBurns {
    const CYCLE: [Self; 6] = [
        Self::ZoomIn,
        Self::ZoomOut,
        Self::PanLeft,
        Self::PanRight,
        Self::PanUp,
        Self::PanDown,
    ];

    /// Motion for the scene at `index`, round-robin so neighbours differ.
    pub fn for_scene(index: usize) -> Self {
        Self::CYCLE[index % Self::CYCLE.len()]
    }

    /// Source rectangle (image pixels) shown at scene progress `p` in `[0, 1]`.
    ///
    /// Starts from the largest centered crop matching the canvas aspect, shrinks it by the zoom
    /// factor and shifts it by the pan offset.
    pub fn source_crop(self, image: (f64, f64), canvas: Canvas, p: f64) -> Rect {
        let (iw, ih) = image;
        let p = Ease::Linear.apply(p);
        let target = canvas.aspect();
        let (base_w, base_h) = if iw / ih > target {
            (ih * target, ih)
        } else {
            (iw, iw / target)
        };

        let zoom = match self {
            Self::ZoomIn => 1.0 + (MAX_ZOOM - 1.0) * p,
            Self::ZoomOut => MAX_ZOOM - (MAX_ZOOM - 1.0) * p,
            _ => MAX_ZOOM,
        };
        let (w, h) = (base_w / zoom, base_h / zoom);

        // pan offset in canvas fractions, converted to source pixels through the crop width
        let travel = -PAN_FRACTION + 2.0 * PAN_FRACTION * p;
        let (fx, fy) = match self {
            Self::ZoomIn | Self::ZoomOut => (0.0, 0.0),
            Self::PanLeft => (travel, 0.0),
            Self::PanRight => (-travel, 0.0),
            Self::PanUp => (0.0, travel),
            Self::PanDown => (0.0, -travel),
        };
        let cx = iw / 2.0 + fx * w;
        let cy = ih / 2.0 + fy * h;
        Rect::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }
}

/// Number of caption words visible at `local` seconds into a scene of `duration` seconds.
///
/// Every word gets an equal share of the scene; the first word shows immediately.
pub fn caption_words_shown(local: f64, duration: f64, word_count: usize) -> usize {
    if word_count == 0 {
        return 0;
    }
    if duration <= 0.0 {
        return word_count;
    }
    let per_word = duration / word_count as f64;
    let shown = (local.max(0.0) / per_word).floor() as usize + 1;
    shown.min(word_count)
}

pub(crate) fn draw_scene(
    f: &mut FrameCtx<'_>,
    index: usize,
    scene: &Scene,
    local: f64,
    duration: f64,
) -> ReelResult<()> {
    let SceneLayout::V1 { caption_text, .. } = &scene.layout else {
        return Ok(());
    };
    let canvas = f.canvas;

    if let Some(id) = scene.v1_image_id()
        && let Some(img) = f.store.image(id)
    {
        let paint = f.res.image_paint(id, img)?;
        let progress = if duration > 0.0 { local / duration } else { 0.0 };
        let crop = KenBurns::for_scene(index).source_crop(
            (f64::from(img.width), f64::from(img.height)),
            canvas,
            progress,
        );
        let t = Affine::scale_non_uniform(
            f64::from(canvas.width) / crop.width(),
            f64::from(canvas.height) / crop.height(),
        ) * Affine::translate((-crop.x0, -crop.y0));
        f.rc.set_transform(affine_to_cpu(t));
        f.rc.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        f.rc.set_paint(paint);
        f.rc.fill_rect(&rect_to_cpu(crop));
    } else {
        tracing::trace!(scene = %scene.id, "v1 scene image not in store");
    }

    if let Some(caption) = caption_text.as_deref() {
        draw_caption(f, caption, local, duration)?;
    }
    Ok(())
}

fn draw_caption(f: &mut FrameCtx<'_>, caption: &str, local: f64, duration: f64) -> ReelResult<()> {
    let words: Vec<&str> = caption.split_whitespace().collect();
    let shown = caption_words_shown(local, duration, words.len());
    if shown == 0 {
        return Ok(());
    }
    let Some(font) = f.store.font(f.engine.default_font_family.as_deref()) else {
        return Ok(());
    };

    let canvas = f.canvas;
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
    let size = (f.engine.caption_size_ratio * ch) as f32;
    let style = BlockStyle {
        size_px: size,
        weight: 700,
        line_height: 1.25,
        align: TextAlign::Center,
        color: RgbaColor::WHITE,
    };
    let max_w = cw * 0.9;
    let block = f
        .res
        .text
        .layout_block(&words[..shown].join(" "), font, &style, max_w)?;
    let font_paint = f.res.font_paint(font);

    let left = cw * 0.05;
    let top = ch * 0.92 - block.height;
    let size = f64::from(size);

    if f.mode == RenderMode::Export {
        let pad = size * 0.4;
        let x0 = left + (max_w - block.width) / 2.0 - pad;
        let plate = vello_cpu::kurbo::RoundedRect::new(
            x0,
            top - pad / 2.0,
            x0 + block.width + 2.0 * pad,
            top + block.height + pad / 2.0,
            size * 0.3,
        );
        let mut path = vello_cpu::kurbo::BezPath::new();
        for el in vello_cpu::kurbo::Shape::path_elements(&plate, 0.1) {
            path.push(el);
        }
        f.rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        f.rc.set_paint(color_to_cpu([0, 0, 0, 140]));
        f.rc.fill_path(&path);
    }

    let shadow = (size * 0.06).max(2.0);
    draw_block(
        f.rc,
        &font_paint,
        &block,
        Affine::translate((left + shadow, top + shadow)),
        Some([0, 0, 0, 180]),
    );
    draw_block(
        f.rc,
        &font_paint,
        &block,
        Affine::translate((left, top)),
        None,
    );
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/ken_burns.rs"]
mod tests;
