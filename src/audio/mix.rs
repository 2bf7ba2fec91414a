use crate::assets::store::AssetStore;
use crate::audio::buffer::{AudioBuffer, MixedAudioTrack};
use crate::eval::timeline::Timeline;
use crate::foundation::config::EngineContext;
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::model::Script;

/// Build the mixed track of a script from the store's narration and music.
pub fn mix_script_audio(
    script: &Script,
    store: &AssetStore,
    ctx: &EngineContext,
) -> ReelResult<MixedAudioTrack> {
    let narrations: Vec<Option<&AudioBuffer>> = script
        .scenes
        .iter()
        .map(|s| store.narration(&s.narration_segment_id))
        .collect();
    mix_audio(&narrations, store.music(), ctx)
}

/// Concatenate narration buffers in scene order and overlay looped music.
///
/// `None` entries (scenes without narration) contribute zero length. Every input is resampled
/// to the context rate and channel layout. The result is a pure function of the inputs.
#[tracing::instrument(skip(narrations, music, ctx), fields(scenes = narrations.len()))]
pub fn mix_audio(
    narrations: &[Option<&AudioBuffer>],
    music: Option<&AudioBuffer>,
    ctx: &EngineContext,
) -> ReelResult<MixedAudioTrack> {
    if ctx.sample_rate == 0 || ctx.channels == 0 {
        return Err(ReelError::mix(
            "mix output format must have a non-zero rate and channel count",
        ));
    }

    let timeline = Timeline::from_durations(
        narrations
            .iter()
            .copied()
            .map(|n| n.map_or(0.0, AudioBuffer::duration_secs)),
    );
    let mut out = concat_narration(narrations, &timeline, ctx)?;

    if let Some(music) = music.filter(|m| m.frames() > 0) {
        overlay_looped(&mut out, music, ctx.music_gain, ctx);
    }
    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }

    let buffer = AudioBuffer::new(ctx.sample_rate, ctx.channels, out)?;
    tracing::debug!(
        frames = buffer.frames(),
        duration = buffer.duration_secs(),
        with_music = music.is_some(),
        "mixed audio track"
    );
    Ok(MixedAudioTrack::from_buffer(buffer))
}

fn secs_to_sample(secs: f64, rate: u32) -> usize {
    (secs * f64::from(rate)).round().max(0.0) as usize
}

fn concat_narration(
    narrations: &[Option<&AudioBuffer>],
    timeline: &Timeline,
    ctx: &EngineContext,
) -> ReelResult<Vec<f32>> {
    let channels = usize::from(ctx.channels);
    let total_frames = secs_to_sample(timeline.total_duration(), ctx.sample_rate);
    let mut out = vec![0.0f32; total_frames * channels];

    let mut cursor = 0usize;
    for (buf, span) in narrations.iter().copied().zip(timeline.spans()) {
        let Some(buf) = buf.filter(|_| span.is_playable()) else {
            continue;
        };
        let start = secs_to_sample(span.start, ctx.sample_rate);
        let end = secs_to_sample(span.end(), ctx.sample_rate);
        if start != cursor || end > total_frames {
            return Err(ReelError::mix(format!(
                "narration placement [{start}, {end}) does not continue at sample {cursor} within {total_frames} frames"
            )));
        }
        place_resampled(&mut out[start * channels..end * channels], buf, ctx);
        cursor = end;
    }

    if cursor != total_frames {
        return Err(ReelError::mix(format!(
            "concatenated narration covers {cursor} frames, expected {total_frames}"
        )));
    }
    Ok(out)
}

fn place_resampled(dst: &mut [f32], src: &AudioBuffer, ctx: &EngineContext) {
    let channels = usize::from(ctx.channels);
    let ratio = f64::from(src.sample_rate()) / f64::from(ctx.sample_rate);
    for (i, frame) in dst.chunks_exact_mut(channels).enumerate() {
        let pos = i as f64 * ratio;
        for (ch, slot) in frame.iter_mut().enumerate() {
            *slot += source_value(src, pos, ch as u16, ctx.channels);
        }
    }
}

fn overlay_looped(out: &mut [f32], music: &AudioBuffer, gain: f32, ctx: &EngineContext) {
    let channels = usize::from(ctx.channels);
    let music_frames = music.frames() as f64;
    let ratio = f64::from(music.sample_rate()) / f64::from(ctx.sample_rate);
    for (i, frame) in out.chunks_exact_mut(channels).enumerate() {
        let pos = (i as f64 * ratio) % music_frames;
        for (ch, slot) in frame.iter_mut().enumerate() {
            *slot += source_value(music, pos, ch as u16, ctx.channels) * gain;
        }
    }
}

/// Source value for one output channel, averaging down to mono when needed.
fn source_value(src: &AudioBuffer, pos: f64, out_ch: u16, out_channels: u16) -> f32 {
    if out_channels == 1 && src.channels() > 1 {
        let sum: f32 = (0..src.channels()).map(|c| src.sample_at(pos, c)).sum();
        sum / f32::from(src.channels())
    } else {
        src.sample_at(pos, out_ch)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
