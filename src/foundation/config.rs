use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::core::{AspectRatio, Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Narration sample rate used by the mixer and export pipeline.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// Export capture rate.
pub const DEFAULT_FPS: u32 = 30;
/// Target video bitrate for encoded exports, in bits per second.
pub const DEFAULT_VIDEO_BITRATE: u32 = 8_000_000;
/// Fixed background-music gain applied during mixing and playback.
pub const DEFAULT_MUSIC_GAIN: f32 = 0.2;
/// Cross-scene transition length in seconds.
pub const TRANSITION_DURATION: f64 = 0.5;
/// Master fade-to-black length in seconds (layout v2).
pub const FADE_DURATION: f64 = 0.5;

/// Serializable engine configuration.
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Output aspect ratio preset.
    pub aspect_ratio: AspectRatio,
    /// Export capture rate.
    pub fps: Fps,
    /// Mixing/export sample rate in Hz.
    pub sample_rate: u32,
    /// Mixed output channel count.
    pub channels: u16,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Background music gain in `[0, 1]`.
    pub music_gain: f32,
    /// Scene crossfade duration in seconds.
    pub transition_duration: f64,
    /// Whole-video fade-to-black duration in seconds.
    pub fade_duration: f64,
    /// Caption font size as a fraction of canvas height.
    pub caption_size_ratio: f64,
    /// Font family used for captions and for text elements whose family is not loaded.
    pub default_font_family: Option<String>,
    /// ffmpeg video encoder name.
    pub video_codec: String,
    /// ffmpeg audio encoder name.
    pub audio_codec: String,
    /// Background color used to flatten alpha before encoding (straight RGBA8).
    pub background_rgba: [u8; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            fps: Fps {
                num: DEFAULT_FPS,
                den: 1,
            },
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            video_bitrate: DEFAULT_VIDEO_BITRATE,
            music_gain: DEFAULT_MUSIC_GAIN,
            transition_duration: TRANSITION_DURATION,
            fade_duration: FADE_DURATION,
            caption_size_ratio: 0.05,
            default_font_family: None,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            background_rgba: [0, 0, 0, 255],
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse engine config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open engine config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ReelResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if self.sample_rate == 0 {
            return Err(ReelError::validation("sampleRate must be > 0"));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(ReelError::validation("channels must be 1 or 2"));
        }
        if self.video_bitrate == 0 {
            return Err(ReelError::validation("videoBitrate must be > 0"));
        }
        if !self.music_gain.is_finite() || !(0.0..=1.0).contains(&self.music_gain) {
            return Err(ReelError::validation("musicGain must be within [0, 1]"));
        }
        for (name, v) in [
            ("transitionDuration", self.transition_duration),
            ("fadeDuration", self.fade_duration),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReelError::validation(format!("{name} must be > 0")));
            }
        }
        if !self.caption_size_ratio.is_finite()
            || self.caption_size_ratio <= 0.0
            || self.caption_size_ratio > 0.5
        {
            return Err(ReelError::validation(
                "captionSizeRatio must be within (0, 0.5]",
            ));
        }
        if self.video_codec.trim().is_empty() || self.audio_codec.trim().is_empty() {
            return Err(ReelError::validation("codec names must be non-empty"));
        }
        Ok(())
    }
}

/// Explicit engine context passed into every component.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineContext {
    /// Output canvas.
    pub canvas: Canvas,
    /// Export capture rate.
    pub fps: Fps,
    /// Mixing sample rate in Hz.
    pub sample_rate: u32,
    /// Mixed output channel count.
    pub channels: u16,
    /// Background music gain.
    pub music_gain: f32,
    /// Scene crossfade duration in seconds.
    pub transition_duration: f64,
    /// Whole-video fade duration in seconds.
    pub fade_duration: f64,
    /// Caption font size as a fraction of canvas height.
    pub caption_size_ratio: f64,
    /// Preferred caption font family.
    pub default_font_family: Option<String>,
}

impl EngineContext {
    /// Build a context from a validated configuration.
    pub fn from_config(cfg: &EngineConfig) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self {
            canvas: cfg.aspect_ratio.canvas(),
            fps: cfg.fps,
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            music_gain: cfg.music_gain,
            transition_duration: cfg.transition_duration,
            fade_duration: cfg.fade_duration,
            caption_size_ratio: cfg.caption_size_ratio,
            default_font_family: cfg.default_font_family.clone(),
        })
    }

    /// Default context for an aspect ratio preset.
    pub fn for_aspect(aspect: AspectRatio) -> Self {
        let cfg = EngineConfig::default();
        Self {
            canvas: aspect.canvas(),
            fps: cfg.fps,
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            music_gain: cfg.music_gain,
            transition_duration: cfg.transition_duration,
            fade_duration: cfg.fade_duration,
            caption_size_ratio: cfg.caption_size_ratio,
            default_font_family: cfg.default_font_family,
        }
    }

    /// Replace the canvas, keeping everything else.
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::for_aspect(AspectRatio::default())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
