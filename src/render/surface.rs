use crate::assets::decode::RasterImage;
use crate::foundation::core::{Affine, Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag makes this explicit at API
/// boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Mean of each channel over the whole frame.
    pub fn mean_rgba(&self) -> [f64; 4] {
        let mut sum = [0u64; 4];
        for px in self.data.chunks_exact(4) {
            for (s, &c) in sum.iter_mut().zip(px) {
                *s += u64::from(c);
            }
        }
        let n = (self.data.len() / 4).max(1) as f64;
        sum.map(|s| s as f64 / n)
    }
}

pub(crate) fn canvas_dims_u16(canvas: Canvas) -> ReelResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ReelError::evaluation("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ReelError::evaluation("canvas height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ReelError::evaluation("canvas must be non-empty"));
    }
    Ok((w, h))
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

pub(crate) fn color_to_cpu(rgba: [u8; 4]) -> vello_cpu::peniko::Color {
    let [r, g, b, a] = rgba;
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

pub(crate) fn image_to_paint(img: &RasterImage) -> ReelResult<vello_cpu::Image> {
    let w: u16 = img
        .width
        .try_into()
        .map_err(|_| ReelError::evaluation("image width exceeds u16"))?;
    let h: u16 = img
        .height
        .try_into()
        .map_err(|_| ReelError::evaluation("image height exceeds u16"))?;
    if img.rgba8_premul.len() != img.width as usize * img.height as usize * 4 {
        return Err(ReelError::evaluation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(img.width as usize * img.height as usize);
    for px in img.rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Fit `src` (width, height) into `dst` and return the uniform scale.
///
/// Cover fills `dst` entirely (overflow is cropped); contain fits inside it.
pub(crate) fn fit_scale(src: (f64, f64), dst: (f64, f64), cover: bool) -> f64 {
    let sx = dst.0 / src.0.max(1e-9);
    let sy = dst.1 / src.1.max(1e-9);
    if cover { sx.max(sy) } else { sx.min(sy) }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
