use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};

/// Immutable decoded PCM: interleaved `f32` samples plus format.
///
/// Cloning is cheap; the sample storage is shared.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Arc<Vec<f32>>,
}

impl AudioBuffer {
    /// Wrap interleaved samples; the sample count must be a whole number of frames.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> ReelResult<Self> {
        if sample_rate == 0 {
            return Err(ReelError::validation("audio sample rate must be > 0"));
        }
        if channels == 0 {
            return Err(ReelError::validation("audio channel count must be > 0"));
        }
        if !samples.len().is_multiple_of(usize::from(channels)) {
            return Err(ReelError::mix(format!(
                "{} samples do not divide into {channels} interleaved channels",
                samples.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples: Arc::new(samples),
        })
    }

    /// Mono silence of `secs` seconds.
    pub fn silence(sample_rate: u32, secs: f64) -> ReelResult<Self> {
        let frames = (secs.max(0.0) * f64::from(sample_rate)).round() as usize;
        Self::new(sample_rate, 1, vec![0.0; frames])
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// `true` if both buffers share the same sample storage.
    pub fn same_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    /// Linearly interpolated sample of `channel` at fractional frame `pos`.
    ///
    /// Mono sources feed every channel; missing channels fall back to channel 0.
    pub(crate) fn sample_at(&self, pos: f64, channel: u16) -> f32 {
        let frames = self.frames();
        if frames == 0 || !pos.is_finite() || pos < 0.0 {
            return 0.0;
        }
        let f0 = pos.floor() as usize;
        if f0 >= frames {
            return 0.0;
        }
        let f1 = (f0 + 1).min(frames - 1);
        let frac = (pos - f0 as f64) as f32;
        let ch = if channel < self.channels { channel } else { 0 };
        let stride = usize::from(self.channels);
        let v0 = self.samples[f0 * stride + usize::from(ch)];
        let v1 = self.samples[f1 * stride + usize::from(ch)];
        v0 + (v1 - v0) * frac
    }
}

/// The single mixed PCM track of a script, shared by playback and export.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudioTrack {
    buffer: AudioBuffer,
}

impl MixedAudioTrack {
    pub(crate) fn from_buffer(buffer: AudioBuffer) -> Self {
        Self { buffer }
    }

    /// Underlying buffer.
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.buffer.channels
    }

    /// Sample frames in the track.
    pub fn frames(&self) -> usize {
        self.buffer.frames()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }

    /// Little-endian `f32` byte image of the interleaved samples.
    pub fn to_f32le_bytes(&self) -> Vec<u8> {
        let samples = self.buffer.samples();
        let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
        for &sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    /// Write raw interleaved little-endian `f32` PCM (the format the encoder consumes).
    pub fn write_f32le(&self, out_path: &Path) -> ReelResult<()> {
        crate::encode::ffmpeg::ensure_parent_dir(out_path)?;
        let mut f = std::fs::File::create(out_path).map_err(|e| {
            ReelError::mix(format!(
                "failed to create mixed audio file '{}': {e}",
                out_path.display()
            ))
        })?;
        f.write_all(&self.to_f32le_bytes()).map_err(|e| {
            ReelError::mix(format!(
                "failed to write mixed audio file '{}': {e}",
                out_path.display()
            ))
        })
    }

    /// Write a 32-bit float WAV file.
    pub fn write_wav(&self, out_path: &Path) -> ReelResult<()> {
        crate::encode::ffmpeg::ensure_parent_dir(out_path)?;
        let spec = hound::WavSpec {
            channels: self.channels(),
            sample_rate: self.sample_rate(),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let wav_err = |e: hound::Error| {
            ReelError::mix(format!("failed to write WAV '{}': {e}", out_path.display()))
        };
        let mut writer = hound::WavWriter::create(out_path, spec).map_err(wav_err)?;
        for &s in self.buffer.samples() {
            writer.write_sample(s).map_err(wav_err)?;
        }
        writer.finalize().map_err(wav_err)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/buffer.rs"]
mod tests;
