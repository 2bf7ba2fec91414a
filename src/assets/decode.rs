use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::audio::buffer::AudioBuffer;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Decoded raster image in premultiplied RGBA8, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, shared between clones.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Wrap existing premultiplied pixels.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: Vec<u8>) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation("image dimensions must be non-zero"));
        }
        let expected = width as usize * height as usize * 4;
        if rgba8_premul.len() != expected {
            return Err(ReelError::validation(format!(
                "image buffer has {} bytes, expected {expected}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Single-color image.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> ReelResult<Self> {
        let px = [color.r, color.g, color.b, color.a];
        Self::from_premul_rgba8(width, height, px.repeat(width as usize * height as usize))
    }

    /// `true` if both handles point at the same pixel storage.
    pub fn same_pixels(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.rgba8_premul, &other.rgba8_premul)
    }
}

/// Decode any format the `image` crate recognizes into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> ReelResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    RasterImage::from_premul_rgba8(width, height, rgba8_premul)
}

/// Decode a WAV stream (integer or float PCM) into interleaved `f32`.
pub fn decode_wav<R: std::io::Read>(reader: R) -> ReelResult<AudioBuffer> {
    let reader = hound::WavReader::new(reader).context("read WAV header")?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("read WAV float samples")?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .context("read WAV integer samples")?
        }
    };
    AudioBuffer::new(spec.sample_rate, spec.channels, samples)
}

/// Decode an audio file.
///
/// `.wav` files are read directly; anything else is converted by the system `ffmpeg` to
/// `sample_rate`/`channels` float PCM.
pub fn decode_audio_file(path: &Path, sample_rate: u32, channels: u16) -> ReelResult<AudioBuffer> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open WAV '{}'", path.display()))?;
        return decode_wav(std::io::BufReader::new(f));
    }
    decode_audio_ffmpeg(path, sample_rate, channels)
}

fn decode_audio_ffmpeg(path: &Path, sample_rate: u32, channels: u16) -> ReelResult<AudioBuffer> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::evaluation(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::evaluation(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::evaluation(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let pcm = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    AudioBuffer::new(sample_rate, channels, pcm)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
