//! Frame-locked offline export.
//!
//! Frames are rendered at `i / fps` for `i in 0..round(total * fps)` and pushed to a
//! [`FrameSink`] together with the pre-mixed audio track. Any render or sink failure aborts the
//! sink and ends the job; nothing is retried.

use std::path::PathBuf;

use crate::assets::store::AssetStore;
use crate::audio::buffer::MixedAudioTrack;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::eval::timeline::Timeline;
use crate::foundation::config::EngineContext;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::compositor::{Compositor, RenderMode, canvas_for};
use crate::script::model::Script;

/// Lifecycle of an export job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportStatus {
    /// Frames are being captured.
    Running,
    /// The sink finalized its output.
    Finished,
    /// Rendering or encoding failed; the sink was aborted.
    Failed,
}

/// Progress of one export run. Terminal once `Finished` or `Failed`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportJob {
    /// Timeline seconds covered by the frames captured so far.
    pub elapsed: f64,
    /// Frames pushed to the sink.
    pub frames_captured: u64,
    /// Frames the job will push in total.
    pub frames_total: u64,
    /// Video duration in seconds.
    pub total_duration: f64,
    /// Current status.
    pub status: ExportStatus,
}

impl ExportJob {
    /// `elapsed / total_duration`, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_duration > 0.0 {
            (self.elapsed / self.total_duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Summary of a finished export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportReport {
    /// Frames encoded.
    pub frames: u64,
    /// Audio frames (samples per channel) handed to the sink.
    pub audio_frames: usize,
    /// Video duration in seconds.
    pub duration: f64,
    /// Output file, for sinks that write one.
    pub output: Option<PathBuf>,
}

/// Render `script` at the context frame rate into `sink`.
///
/// `mixed` must come from the same script and store (see
/// [`crate::audio::mix::mix_script_audio`]); a length that disagrees with the timeline by more
/// than one sample is a [`ReelError::Mix`]. `on_progress` sees the job after every frame and once
/// more in its terminal state.
#[tracing::instrument(skip_all, fields(scenes = script.scenes.len()))]
pub fn export_video(
    script: &Script,
    store: &AssetStore,
    mixed: Option<&MixedAudioTrack>,
    sink: &mut dyn FrameSink,
    ctx: &EngineContext,
    mut on_progress: impl FnMut(&ExportJob),
) -> ReelResult<ExportReport> {
    let timeline = Timeline::for_script(script, store);
    let total = timeline.total_duration();
    if total <= 0.0 {
        return Err(ReelError::validation(
            "nothing to export: script has no narrated scenes",
        ));
    }
    if let Some(track) = mixed {
        check_audio_length(track, total)?;
    }

    let frames_total = ctx.fps.secs_to_frames_round(total);
    let canvas = canvas_for(ctx, script);
    let mut job = ExportJob {
        elapsed: 0.0,
        frames_captured: 0,
        frames_total,
        total_duration: total,
        status: ExportStatus::Running,
    };

    tracing::info!(
        duration = total,
        frames = frames_total,
        width = canvas.width,
        height = canvas.height,
        "export started"
    );
    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: ctx.fps,
        audio: mixed.cloned(),
    })
    .inspect_err(|_| sink.abort())?;

    let mut compositor = Compositor::new(ctx.clone(), RenderMode::Export);
    let captured = capture(
        &mut compositor,
        &timeline,
        script,
        store,
        sink,
        ctx,
        &mut job,
        &mut on_progress,
    )
    .and_then(|()| sink.end());

    if let Err(e) = captured {
        tracing::warn!(
            frames = job.frames_captured,
            error = %e,
            "export failed; aborting sink"
        );
        sink.abort();
        job.status = ExportStatus::Failed;
        on_progress(&job);
        return Err(e);
    }

    job.status = ExportStatus::Finished;
    job.elapsed = total;
    on_progress(&job);
    tracing::info!(frames = job.frames_captured, "export finished");
    Ok(ExportReport {
        frames: job.frames_captured,
        audio_frames: mixed.map_or(0, MixedAudioTrack::frames),
        duration: total,
        output: sink.output_path().map(PathBuf::from),
    })
}

#[allow(clippy::too_many_arguments)]
fn capture(
    compositor: &mut Compositor,
    timeline: &Timeline,
    script: &Script,
    store: &AssetStore,
    sink: &mut dyn FrameSink,
    ctx: &EngineContext,
    job: &mut ExportJob,
    on_progress: &mut impl FnMut(&ExportJob),
) -> ReelResult<()> {
    for i in 0..job.frames_total {
        let idx = FrameIndex(i);
        let t = ctx.fps.frame_to_secs(idx);
        let frame = compositor.render_frame_with(timeline, t, script, store)?;
        sink.push_frame(idx, &frame)?;
        job.frames_captured = i + 1;
        job.elapsed = ctx.fps.frame_to_secs(FrameIndex(i + 1)).min(job.total_duration);
        on_progress(&*job);
    }
    Ok(())
}

fn check_audio_length(track: &MixedAudioTrack, total: f64) -> ReelResult<()> {
    let expected = (total * f64::from(track.sample_rate())).round();
    let actual = track.frames() as f64;
    if (actual - expected).abs() > 1.0 {
        return Err(ReelError::mix(format!(
            "mixed audio has {actual} frames but the timeline needs {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
