//! Text shaping with Parley and greedy word wrapping.
//!
//! Wrapping is done here rather than by Parley's line breaker so captions and text elements
//! break only at whitespace and every line can be aligned independently.

use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::store::FontData;
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::color::RgbaColor;
use crate::script::model::TextAlign;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<RgbaColor> for TextBrushRgba8 {
    fn from(c: RgbaColor) -> Self {
        let [r, g, b, a] = c.0;
        Self { r, g, b, a }
    }
}

/// Font size, weight, spacing and alignment of one text block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BlockStyle {
    pub(crate) size_px: f32,
    pub(crate) weight: u16,
    pub(crate) line_height: f32,
    pub(crate) align: TextAlign,
    pub(crate) color: RgbaColor,
}

/// One shaped line, positioned relative to the block's top-left corner.
pub(crate) struct BlockLine {
    pub(crate) layout: parley::Layout<TextBrushRgba8>,
    pub(crate) x: f64,
    pub(crate) y: f64,
}

/// A wrapped, aligned text block.
pub(crate) struct TextBlock {
    pub(crate) lines: Vec<BlockLine>,
    /// Widest line, in pixels.
    pub(crate) width: f64,
    /// Total block height, in pixels.
    pub(crate) height: f64,
}

/// Split `words` into lines no wider than `max_width`.
///
/// A single word wider than `max_width` gets a line of its own.
pub fn wrap_words<F>(words: &[&str], max_width: f32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in words {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Horizontal offset of a line of width `line_w` inside a box of width `box_w`.
pub fn align_offset(align: TextAlign, box_w: f64, line_w: f64) -> f64 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => (box_w - line_w) / 2.0,
        TextAlign::Right => box_w - line_w,
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    // family key -> (registered bytes, family name as registered with fontique)
    registered: HashMap<String, (Arc<Vec<u8>>, String)>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            registered: HashMap::new(),
        }
    }

    fn family_name(&mut self, font: &FontData) -> ReelResult<String> {
        if let Some((bytes, name)) = self.registered.get(&font.family)
            && Arc::ptr_eq(bytes, &font.bytes)
        {
            return Ok(name.clone());
        }
        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::validation(format!(
                "no font families registered from font '{}'",
                font.family
            ))
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();
        self.registered
            .insert(font.family.clone(), (font.bytes.clone(), name.clone()));
        Ok(name)
    }

    fn layout_line(
        &mut self,
        text: &str,
        family_name: &str,
        style: &BlockStyle,
    ) -> parley::Layout<TextBrushRgba8> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name.to_owned())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(style.weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(style.color.into()));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout.align(
            None,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        layout
    }

    /// Shape `text`, wrap it to `max_width` and align each line.
    pub(crate) fn layout_block(
        &mut self,
        text: &str,
        font: &FontData,
        style: &BlockStyle,
        max_width: f64,
    ) -> ReelResult<TextBlock> {
        if !style.size_px.is_finite() || style.size_px <= 0.0 {
            return Err(ReelError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let family = self.family_name(font)?;
        let words: Vec<&str> = text.split_whitespace().collect();
        let lines = wrap_words(&words, max_width as f32, |candidate| {
            self.layout_line(candidate, &family, style).width()
        });

        let advance = f64::from(style.size_px * style.line_height);
        let mut out = Vec::with_capacity(lines.len());
        let mut widest = 0.0f64;
        for (i, line) in lines.iter().enumerate() {
            let layout = self.layout_line(line, &family, style);
            let w = f64::from(layout.width());
            widest = widest.max(w);
            // center each line box vertically within its advance
            let leading = (advance - f64::from(layout.height())).max(0.0) / 2.0;
            out.push(BlockLine {
                x: align_offset(style.align, max_width, w),
                y: i as f64 * advance + leading,
                layout,
            });
        }
        Ok(TextBlock {
            height: advance * out.len() as f64,
            width: widest,
            lines: out,
        })
    }
}

/// Draw a laid-out block with its top-left corner at `origin`.
pub(crate) fn draw_block(
    rc: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    block: &TextBlock,
    origin: crate::foundation::core::Affine,
    color_override: Option<[u8; 4]>,
) {
    rc.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    for line in &block.lines {
        let t = origin * crate::foundation::core::Affine::translate((line.x, line.y));
        rc.set_transform(crate::render::surface::affine_to_cpu(t));
        for l in line.layout.lines() {
            for item in l.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let rgba = color_override.unwrap_or_else(|| {
                    let b = run.style().brush;
                    [b.r, b.g, b.b, b.a]
                });
                rc.set_paint(crate::render::surface::color_to_cpu(rgba));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                rc.glyph_run(font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
