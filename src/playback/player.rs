//! Interactive playback driven by a [`Clock`].
//!
//! The host calls [`PlaybackClock::tick`] once per display refresh. Each tick recomputes the
//! cursor from the clock, resolves the active scene and renders one frame. Narration and music
//! are handed to an [`AudioOutput`] with start times on the same clock, so audio keeps running
//! between ticks.

use crate::assets::store::AssetStore;
use crate::eval::timeline::Timeline;
use crate::foundation::config::EngineContext;
use crate::foundation::error::ReelResult;
use crate::playback::clock::Clock;
use crate::playback::output::{AudioOutput, ScheduledSource, SourceId};
use crate::render::compositor::{Compositor, RenderMode};
use crate::render::surface::FrameRGBA;
use crate::script::model::Script;

const START_EPSILON: f64 = 1e-9;

/// Observable playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackState {
    /// Whether the cursor is advancing.
    pub is_playing: bool,
    /// Cursor in seconds, within `[0, total]`.
    pub current_time: f64,
    /// Scene under the cursor; `None` for an empty timeline.
    pub active_scene_index: Option<usize>,
}

/// Result of one [`PlaybackClock::tick`].
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutcome {
    /// Frame at the cursor.
    pub frame: FrameRGBA,
    /// `current_time / total`, in `[0, 1]`.
    pub progress: f64,
    /// `true` on the tick that reached the end and stopped playback.
    pub finished: bool,
}

/// Playback Clock: owns the cursor, the scheduled audio sources and a preview compositor.
pub struct PlaybackClock<'a, C: Clock, O: AudioOutput> {
    script: &'a Script,
    store: &'a AssetStore,
    timeline: Timeline,
    compositor: Compositor,
    clock: C,
    output: O,
    music_gain: f32,
    state: PlaybackState,
    // clock time at which the cursor was at `anchor_cursor`
    anchor_clock: f64,
    anchor_cursor: f64,
    sources: Vec<SourceId>,
}

impl<'a, C: Clock, O: AudioOutput> PlaybackClock<'a, C, O> {
    /// Stopped player at time zero.
    pub fn new(
        script: &'a Script,
        store: &'a AssetStore,
        ctx: EngineContext,
        clock: C,
        output: O,
    ) -> Self {
        let timeline = Timeline::for_script(script, store);
        let state = PlaybackState {
            active_scene_index: timeline.resolve(0.0).map(|r| r.index),
            ..PlaybackState::default()
        };
        Self {
            script,
            store,
            timeline,
            music_gain: ctx.music_gain,
            compositor: Compositor::new(ctx, RenderMode::Preview),
            clock,
            output,
            state,
            anchor_clock: 0.0,
            anchor_cursor: 0.0,
            sources: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Timeline the player runs on.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Total duration in seconds.
    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// The audio output.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Number of sources currently scheduled on the output.
    pub fn scheduled_sources(&self) -> usize {
        self.sources.len()
    }

    /// Start advancing from the cursor. At the end of the timeline this restarts from zero.
    #[tracing::instrument(level = "debug", skip(self), fields(cursor = self.state.current_time))]
    pub fn play(&mut self) {
        if self.state.is_playing {
            return;
        }
        if self.state.current_time >= self.total_duration() {
            self.set_cursor(0.0);
        }
        self.start_from_cursor();
        self.state.is_playing = true;
    }

    /// Freeze the cursor where it is and release all audio.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn pause(&mut self) {
        if !self.state.is_playing {
            return;
        }
        let t = self.elapsed();
        self.release_sources();
        self.state.is_playing = false;
        self.set_cursor(t);
    }

    /// `play` when stopped, `pause` when playing.
    pub fn toggle(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop, release all audio and rewind to zero.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn stop(&mut self) {
        self.release_sources();
        self.state.is_playing = false;
        self.set_cursor(0.0);
    }

    /// Move the cursor to `t` (clamped to the timeline). Audio is rescheduled when playing.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn seek(&mut self, t: f64) {
        let t = if t.is_finite() { t } else { 0.0 };
        self.set_cursor(t.clamp(0.0, self.total_duration()));
        if self.state.is_playing {
            self.release_sources();
            self.start_from_cursor();
        }
    }

    /// Advance the cursor from the clock and render the frame under it.
    ///
    /// Reaching the total duration stops playback and leaves the cursor at the end.
    pub fn tick(&mut self) -> ReelResult<TickOutcome> {
        let mut finished = false;
        if self.state.is_playing {
            let t = self.elapsed();
            let total = self.total_duration();
            if t >= total {
                self.release_sources();
                self.state.is_playing = false;
                self.set_cursor(total);
                finished = true;
                tracing::info!(total, "playback finished");
            } else {
                self.set_cursor(t);
            }
        }

        let frame = self.compositor.render_frame_with(
            &self.timeline,
            self.state.current_time,
            self.script,
            self.store,
        )?;
        Ok(TickOutcome {
            frame,
            progress: self.progress(),
            finished,
        })
    }

    /// `current_time / total`, zero for an empty timeline.
    pub fn progress(&self) -> f64 {
        let total = self.total_duration();
        if total > 0.0 {
            (self.state.current_time / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn elapsed(&self) -> f64 {
        self.anchor_cursor + (self.clock.now() - self.anchor_clock).max(0.0)
    }

    fn set_cursor(&mut self, t: f64) {
        self.state.current_time = t;
        self.state.active_scene_index = self.timeline.resolve(t).map(|r| r.index);
    }

    fn start_from_cursor(&mut self) {
        let now = self.clock.now();
        let cursor = self.state.current_time;
        self.anchor_clock = now;
        self.anchor_cursor = cursor;

        for (scene, span) in self.script.scenes.iter().zip(self.timeline.spans()) {
            if !span.is_playable() || span.start + START_EPSILON < cursor {
                continue;
            }
            let Some(buffer) = self.store.narration(&scene.narration_segment_id) else {
                continue;
            };
            let id = self.output.schedule(ScheduledSource {
                buffer: buffer.clone(),
                when: now + (span.start - cursor),
                offset: 0.0,
                looped: false,
                gain: 1.0,
            });
            self.sources.push(id);
        }

        if let Some(music) = self.store.music().filter(|m| m.duration_secs() > 0.0) {
            let id = self.output.schedule(ScheduledSource {
                buffer: music.clone(),
                when: now,
                offset: cursor % music.duration_secs(),
                looped: true,
                gain: self.music_gain,
            });
            self.sources.push(id);
        }
        tracing::debug!(cursor, sources = self.sources.len(), "scheduled audio");
    }

    fn release_sources(&mut self) {
        for id in self.sources.drain(..) {
            self.output.stop(id);
        }
    }
}

impl<C: Clock, O: AudioOutput> Drop for PlaybackClock<'_, C, O> {
    fn drop(&mut self) {
        self.release_sources();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/player.rs"]
mod tests;
