//! Storyreel is a deterministic video engine for narrated scene scripts.
//!
//! A [`Script`] is an ordered list of scenes, each paired with a narration clip. The engine
//! turns it into either a live preview or an encoded video:
//!
//! - [`load_assets`] decodes images, narration, music and fonts into an [`AssetStore`]
//! - [`Compositor`] rasterizes the frame at any global time
//! - [`mix_audio`] builds the single mixed track used by both consumers
//! - [`PlaybackClock`] drives interactive playback from a clock
//! - [`export_video`] renders frame-locked into a [`FrameSink`] such as [`FfmpegSink`]
//!
//! Playback and export render through the same compositor, so a given scene-relative time looks
//! the same in both.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Entrance/exit animation evaluation.
pub mod animation;
/// Decoded assets and loading.
pub mod assets;
/// Audio buffers and mixing.
pub mod audio;
pub mod encode;
/// Scene timing.
pub mod eval;
/// Offline export.
pub mod export;
/// Core types, errors and configuration.
pub mod foundation;
pub mod playback;
pub mod render;
pub mod script;

pub use crate::assets::decode::RasterImage;
pub use crate::assets::store::{AssetStore, LoadReport, load_assets};
pub use crate::audio::buffer::{AudioBuffer, MixedAudioTrack};
pub use crate::audio::mix::{mix_audio, mix_script_audio};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::eval::timeline::{SceneMix, Timeline};
pub use crate::export::pipeline::{ExportJob, ExportReport, ExportStatus, export_video};
pub use crate::foundation::config::{EngineConfig, EngineContext};
pub use crate::foundation::core::{AspectRatio, Canvas, Fps, FrameIndex, Rgba8Premul};
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::playback::clock::{Clock, ManualClock, SystemClock};
#[cfg(feature = "live-audio")]
pub use crate::playback::device::DeviceAudioOutput;
pub use crate::playback::output::{AudioOutput, NullAudioOutput, RecordingAudioOutput};
pub use crate::playback::player::{PlaybackClock, PlaybackState, TickOutcome};
pub use crate::render::compositor::{Compositor, RenderMode, render_frame};
pub use crate::render::surface::FrameRGBA;
pub use crate::script::model::Script;
