//! Layout v2: independently animated image and text elements.

use kurbo::Size;

use crate::animation::element::{ElementState, evaluate};
use crate::assets::decode::RasterImage;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::ReelResult;
use crate::render::compositor::FrameCtx;
use crate::render::surface::{affine_to_cpu, fit_scale, rect_to_cpu};
use crate::render::text::{BlockStyle, draw_block};
use crate::script::model::{Element, ElementKind, Scene, TextStyle, VerticalAlign};

/// Placement of an image inside an element box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImagePlacement {
    /// Maps image pixel space into canvas space (before the element transform).
    pub transform: Affine,
    /// Part of the image that lands inside the box, in image pixels.
    pub visible: Rect,
}

/// Fit an image of `image` size into `bbox`, scaled about the box center.
///
/// `cover` fills the box and crops the overflow; otherwise the image is contained. `zoom`
/// magnifies the fitted image, and whatever leaves the box is cropped.
pub fn place_image(image: (f64, f64), bbox: Rect, cover: bool, zoom: f64) -> ImagePlacement {
    let (iw, ih) = image;
    let scale = fit_scale(image, (bbox.width(), bbox.height()), cover) * zoom.max(1e-6);
    let center = bbox.center();
    let transform = Affine::translate(center.to_vec2())
        * Affine::scale(scale)
        * Affine::translate((-iw / 2.0, -ih / 2.0));

    let half_w = bbox.width() / 2.0 / scale;
    let half_h = bbox.height() / 2.0 / scale;
    let visible = Rect::new(
        iw / 2.0 - half_w,
        ih / 2.0 - half_h,
        iw / 2.0 + half_w,
        ih / 2.0 + half_h,
    )
    .intersect(Rect::new(0.0, 0.0, iw, ih));
    ImagePlacement { transform, visible }
}

/// Top edge of a text block of `block_h` pixels inside `bbox`.
pub fn text_top(align: VerticalAlign, bbox: Rect, block_h: f64) -> f64 {
    match align {
        VerticalAlign::Top => bbox.y0,
        VerticalAlign::Middle => bbox.y0 + (bbox.height() - block_h) / 2.0,
        VerticalAlign::Bottom => bbox.y1 - block_h,
    }
}

pub(crate) fn draw_scene(f: &mut FrameCtx<'_>, scene: &Scene, local: f64) -> ReelResult<()> {
    for (i, el) in scene.elements().iter().enumerate() {
        let bbox = el.layout.to_rect(f.canvas);
        let size = Size::new(bbox.width(), bbox.height());
        let Some(state) = evaluate(&el.entrance, el.exit.as_ref(), local, size) else {
            continue;
        };
        if state.is_degenerate() {
            continue;
        }

        let layered = state.opacity < 1.0;
        if layered {
            f.rc.push_opacity_layer(state.opacity as f32);
        }
        match &el.kind {
            ElementKind::Image { .. } => {
                if let Some(id) = el.image_asset_id()
                    && let Some(img) = f.store.image(id)
                {
                    draw_image(f, id, img, bbox, &state, i == 0)?;
                }
            }
            ElementKind::Text { text, style } => draw_text(f, el, text, style, bbox, &state)?,
        }
        if layered {
            f.rc.pop_layer();
        }
    }
    Ok(())
}

fn draw_image(
    f: &mut FrameCtx<'_>,
    id: &str,
    img: &RasterImage,
    bbox: Rect,
    state: &ElementState,
    cover: bool,
) -> ReelResult<()> {
    let placement = place_image(
        (f64::from(img.width), f64::from(img.height)),
        bbox,
        cover,
        state.zoom,
    );
    if placement.visible.width() <= 0.0 || placement.visible.height() <= 0.0 {
        return Ok(());
    }
    let paint = f.res.image_paint(id, img)?;
    f.rc.set_transform(affine_to_cpu(state.transform(bbox) * placement.transform));
    f.rc.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    f.rc.set_paint(paint);
    f.rc.fill_rect(&rect_to_cpu(placement.visible));
    Ok(())
}

fn draw_text(
    f: &mut FrameCtx<'_>,
    el: &Element,
    text: &str,
    style: &TextStyle,
    bbox: Rect,
    state: &ElementState,
) -> ReelResult<()> {
    let Some(font) = f.store.font(style.font_family.as_deref()) else {
        tracing::trace!(element = %el.id, "no font available for text element");
        return Ok(());
    };
    let block_style = BlockStyle {
        size_px: style.font_size,
        weight: style.weight,
        line_height: style.line_height,
        align: style.align,
        color: style.color,
    };
    let block = f
        .res
        .text
        .layout_block(text, font, &block_style, bbox.width())?;
    let font_paint = f.res.font_paint(font);
    let top = text_top(style.vertical_align, bbox, block.height);
    let origin = state.transform(bbox) * Affine::translate((bbox.x0, top));
    draw_block(f.rc, &font_paint, &block, origin, None);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/elements.rs"]
mod tests;
