use std::collections::HashMap;

use crate::assets::decode::RasterImage;
use crate::assets::store::{AssetStore, FontData};
use crate::eval::timeline::{SceneMix, Timeline};
use crate::foundation::config::EngineContext;
use crate::foundation::core::{Affine, Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::surface::{
    FrameRGBA, affine_to_cpu, canvas_dims_u16, color_to_cpu, image_to_paint, rect_to_cpu,
};
use crate::render::text::TextLayoutEngine;
use crate::render::{elements, ken_burns};
use crate::script::model::{LayoutVersion, Scene, Script};

/// Watermark corner cycle period in seconds.
pub const WATERMARK_PERIOD: f64 = 20.0;
/// Fade length at each edge of a watermark phase, in seconds.
pub const WATERMARK_FADE: f64 = 0.25;
/// Watermark opacity cap.
pub const WATERMARK_MAX_OPACITY: f64 = 0.8;

/// Which consumer the frame is for. Export frames carry a plate behind captions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive playback.
    #[default]
    Preview,
    /// Offline export.
    Export,
}

/// Canvas a script renders at: the script's own aspect ratio if set, otherwise the context's.
pub fn canvas_for(ctx: &EngineContext, script: &Script) -> Canvas {
    script
        .aspect_ratio
        .map_or(ctx.canvas, |aspect| aspect.canvas())
}

struct CachedImage {
    source: RasterImage,
    paint: vello_cpu::Image,
}

/// Paint objects derived from store assets, reused across frames.
///
/// Entries are keyed by id and revalidated by pixel-storage identity, so replacing one asset in
/// the store only rebuilds that entry.
#[derive(Default)]
pub(crate) struct Resources {
    pub(crate) text: TextLayoutEngine,
    images: HashMap<String, CachedImage>,
    fonts: HashMap<String, (std::sync::Arc<Vec<u8>>, vello_cpu::peniko::FontData)>,
}

impl Resources {
    pub(crate) fn image_paint(
        &mut self,
        id: &str,
        img: &RasterImage,
    ) -> ReelResult<vello_cpu::Image> {
        if let Some(cached) = self.images.get(id)
            && cached.source.same_pixels(img)
        {
            return Ok(cached.paint.clone());
        }
        let paint = image_to_paint(img)?;
        self.images.insert(
            id.to_owned(),
            CachedImage {
                source: img.clone(),
                paint: paint.clone(),
            },
        );
        Ok(paint)
    }

    pub(crate) fn font_paint(&mut self, font: &FontData) -> vello_cpu::peniko::FontData {
        if let Some((bytes, paint)) = self.fonts.get(&font.family)
            && std::sync::Arc::ptr_eq(bytes, &font.bytes)
        {
            return paint.clone();
        }
        let paint = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
            0,
        );
        self.fonts
            .insert(font.family.clone(), (font.bytes.clone(), paint.clone()));
        paint
    }
}

/// Everything a layout strategy needs to draw one frame.
pub(crate) struct FrameCtx<'a> {
    pub(crate) rc: &'a mut vello_cpu::RenderContext,
    pub(crate) res: &'a mut Resources,
    pub(crate) store: &'a AssetStore,
    pub(crate) engine: &'a EngineContext,
    pub(crate) canvas: Canvas,
    pub(crate) mode: RenderMode,
}

/// Frame Compositor: rasterizes the script at a global time.
///
/// Output depends only on the arguments; two calls with the same time, script and store yield
/// identical bytes.
pub struct Compositor {
    ctx: EngineContext,
    mode: RenderMode,
    res: Resources,
}

impl Compositor {
    /// New compositor for `mode`.
    pub fn new(ctx: EngineContext, mode: RenderMode) -> Self {
        Self {
            ctx,
            mode,
            res: Resources::default(),
        }
    }

    /// Engine context in use.
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Render mode in use.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Render the frame at global time `t` (seconds).
    pub fn render_frame(
        &mut self,
        t: f64,
        script: &Script,
        store: &AssetStore,
    ) -> ReelResult<FrameRGBA> {
        let timeline = Timeline::for_script(script, store);
        self.render_frame_with(&timeline, t, script, store)
    }

    /// Render with a precomputed timeline (playback and export reuse one per run).
    #[tracing::instrument(level = "trace", skip(self, timeline, script, store))]
    pub(crate) fn render_frame_with(
        &mut self,
        timeline: &Timeline,
        t: f64,
        script: &Script,
        store: &AssetStore,
    ) -> ReelResult<FrameRGBA> {
        let canvas = canvas_for(&self.ctx, script);
        let (w, h) = canvas_dims_u16(canvas)?;
        let mut rc = vello_cpu::RenderContext::new(w, h);

        rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        rc.set_paint(color_to_cpu([0, 0, 0, 255]));
        rc.fill_rect(&rect_to_cpu(canvas.rect()));

        let mut f = FrameCtx {
            rc: &mut rc,
            res: &mut self.res,
            store,
            engine: &self.ctx,
            canvas,
            mode: self.mode,
        };

        match script.layout_version() {
            Some(LayoutVersion::V1) => {
                if let Some(mix) = timeline.mix_at(t, self.ctx.transition_duration) {
                    draw_mix(&mut f, script, timeline, mix, ken_burns_scene)?;
                }
            }
            Some(LayoutVersion::V2) => {
                if let Some(mix) = timeline.mix_at(t, self.ctx.fade_duration) {
                    draw_mix(&mut f, script, timeline, mix, element_scene)?;
                }
            }
            None => {}
        }

        if let Some(mark) = store.watermark() {
            draw_watermark(&mut f, mark, t)?;
        }

        if script.layout_version() == Some(LayoutVersion::V2) {
            let black = master_fade(t, timeline.total_duration(), self.ctx.fade_duration);
            if black > 0.0 {
                rc.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                rc.set_paint(color_to_cpu([0, 0, 0, (black * 255.0).round() as u8]));
                rc.fill_rect(&rect_to_cpu(canvas.rect()));
            }
        }

        rc.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        rc.render_to_pixmap(&mut pixmap);
        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

/// One-shot frame render with a fresh compositor in preview mode.
pub fn render_frame(
    ctx: &EngineContext,
    t: f64,
    script: &Script,
    store: &AssetStore,
) -> ReelResult<FrameRGBA> {
    Compositor::new(ctx.clone(), RenderMode::Preview).render_frame(t, script, store)
}

type SceneDraw = fn(&mut FrameCtx<'_>, &Script, usize, f64, f64) -> ReelResult<()>;

fn ken_burns_scene(
    f: &mut FrameCtx<'_>,
    script: &Script,
    index: usize,
    local: f64,
    duration: f64,
) -> ReelResult<()> {
    ken_burns::draw_scene(f, index, scene_at(script, index)?, local, duration)
}

fn element_scene(
    f: &mut FrameCtx<'_>,
    script: &Script,
    index: usize,
    local: f64,
    _duration: f64,
) -> ReelResult<()> {
    elements::draw_scene(f, scene_at(script, index)?, local)
}

fn scene_at(script: &Script, index: usize) -> ReelResult<&Scene> {
    script.scenes.get(index).ok_or_else(|| {
        ReelError::evaluation(format!(
            "timeline scene {index} is out of range for a script with {} scenes",
            script.scenes.len()
        ))
    })
}

fn draw_mix(
    f: &mut FrameCtx<'_>,
    script: &Script,
    timeline: &Timeline,
    mix: SceneMix,
    draw: SceneDraw,
) -> ReelResult<()> {
    let current = mix.current.index;
    let duration = timeline.span(current).map_or(0.0, |s| s.duration);
    // The incoming layer at `p` over a fully drawn outgoing scene leaves `1 - p` of it.
    let outgoing = if mix.incoming.is_some() {
        1.0
    } else {
        mix.outgoing_alpha()
    };
    draw_layered(f, outgoing, |f| {
        draw(f, script, current, mix.current.local_time, duration)
    })?;

    if let Some(next) = mix.incoming {
        let duration = timeline.span(next).map_or(0.0, |s| s.duration);
        draw_layered(f, mix.incoming_alpha(), |f| draw(f, script, next, 0.0, duration))?;
    }
    Ok(())
}

fn draw_layered(
    f: &mut FrameCtx<'_>,
    alpha: f64,
    body: impl FnOnce(&mut FrameCtx<'_>) -> ReelResult<()>,
) -> ReelResult<()> {
    if alpha <= 0.0 {
        return Ok(());
    }
    let layered = alpha < 1.0;
    if layered {
        f.rc.push_opacity_layer(alpha as f32);
    }
    let out = body(f);
    if layered {
        f.rc.pop_layer();
    }
    out
}

/// Opacity of the black overlay that fades the whole video in and out.
pub fn master_fade(t: f64, total: f64, fade: f64) -> f64 {
    if fade <= 0.0 || total <= 0.0 {
        return 0.0;
    }
    let head = 1.0 - t / fade;
    let tail = 1.0 - (total - t) / fade;
    head.max(tail).clamp(0.0, 1.0)
}

/// Watermark box and opacity at global time `t`.
///
/// The mark visits the four corners clockwise from top-left, one per quarter period, fading in
/// and out at the edges of each quarter.
pub fn watermark_placement(t: f64, canvas: Canvas, image: (f64, f64)) -> (Rect, f64) {
    let phase_len = WATERMARK_PERIOD / 4.0;
    let t = t.max(0.0) % WATERMARK_PERIOD;
    let phase = ((t / phase_len).floor() as usize).min(3);
    let into = t - phase as f64 * phase_len;
    let ramp = (into / WATERMARK_FADE)
        .min((phase_len - into) / WATERMARK_FADE)
        .clamp(0.0, 1.0);

    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
    let w = cw * 0.15;
    let h = w * image.1 / image.0.max(1.0);
    let margin = cw.min(ch) * 0.03;
    let (x, y) = match phase {
        0 => (margin, margin),
        1 => (cw - margin - w, margin),
        2 => (cw - margin - w, ch - margin - h),
        _ => (margin, ch - margin - h),
    };
    (Rect::new(x, y, x + w, y + h), ramp * WATERMARK_MAX_OPACITY)
}

fn draw_watermark(f: &mut FrameCtx<'_>, mark: &RasterImage, t: f64) -> ReelResult<()> {
    let (iw, ih) = (f64::from(mark.width), f64::from(mark.height));
    let (bbox, opacity) = watermark_placement(t, f.canvas, (iw, ih));
    if opacity <= 0.0 {
        return Ok(());
    }
    let paint = f.res.image_paint("\0watermark", mark)?;
    let transform = Affine::translate((bbox.x0, bbox.y0))
        * Affine::scale_non_uniform(bbox.width() / iw, bbox.height() / ih);
    f.rc.push_opacity_layer(opacity as f32);
    f.rc.set_transform(affine_to_cpu(transform));
    f.rc.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    f.rc.set_paint(paint);
    f.rc.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
    f.rc.pop_layer();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
