//! Scene timing: cumulative starts, active-scene resolution and crossfade weights.

use crate::assets::store::AssetStore;
use crate::script::model::Script;

/// Timing of one scene on the global timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSpan {
    /// Global start in seconds (sum of the durations before it).
    pub start: f64,
    /// Duration in seconds; zero for scenes without narration.
    pub duration: f64,
}

impl SceneSpan {
    /// Global end in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Scenes without a duration are skipped when resolving time.
    pub fn is_playable(&self) -> bool {
        self.duration > 0.0
    }
}

/// Scene index and scene-local time for a global instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved {
    /// Scene index in script order.
    pub index: usize,
    /// Seconds since the scene started.
    pub local_time: f64,
}

/// Lifecycle phase of the active scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenePhase {
    /// Within the first transition window of the scene.
    Entering,
    /// Fully on screen.
    Steady,
    /// Blending into the next playable scene.
    CrossfadingOut,
}

/// What to draw at one instant: the active scene and, near its end, the incoming one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneMix {
    /// Active (outgoing) scene.
    pub current: Resolved,
    /// Phase of the active scene.
    pub phase: ScenePhase,
    /// Crossfade progress in `[0, 1)`; zero outside a crossfade.
    pub progress: f64,
    /// Next playable scene, present only while crossfading. It is drawn at local time 0.
    pub incoming: Option<usize>,
}

impl SceneMix {
    /// Opacity of the active scene.
    pub fn outgoing_alpha(&self) -> f64 {
        1.0 - self.progress
    }

    /// Opacity of the incoming scene.
    pub fn incoming_alpha(&self) -> f64 {
        if self.incoming.is_some() {
            self.progress
        } else {
            0.0
        }
    }
}

/// Cumulative scene timing for one script.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    spans: Vec<SceneSpan>,
    total: f64,
}

impl Timeline {
    /// Build from per-scene durations; negative and non-finite values count as zero.
    pub fn from_durations(durations: impl IntoIterator<Item = f64>) -> Self {
        let mut spans = Vec::new();
        let mut cursor = 0.0;
        for d in durations {
            let duration = if d.is_finite() && d > 0.0 { d } else { 0.0 };
            spans.push(SceneSpan {
                start: cursor,
                duration,
            });
            cursor += duration;
        }
        Self {
            spans,
            total: cursor,
        }
    }

    /// Durations come from each scene's narration buffer; a missing buffer yields zero.
    pub fn for_script(script: &Script, store: &AssetStore) -> Self {
        Self::from_durations(script.scenes.iter().map(|s| {
            store
                .narration(&s.narration_segment_id)
                .map_or(0.0, |b| b.duration_secs())
        }))
    }

    /// Sum of all scene durations.
    pub fn total_duration(&self) -> f64 {
        self.total
    }

    /// Per-scene spans in script order (including zero-length ones).
    pub fn spans(&self) -> &[SceneSpan] {
        &self.spans
    }

    /// Span of scene `index`.
    pub fn span(&self, index: usize) -> Option<SceneSpan> {
        self.spans.get(index).copied()
    }

    /// `true` when no scene has a duration.
    pub fn is_empty(&self) -> bool {
        self.total <= 0.0
    }

    /// First playable scene after `index`.
    pub fn next_playable(&self, index: usize) -> Option<usize> {
        self.spans
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, s)| s.is_playable())
            .map(|(i, _)| i)
    }

    /// Resolve a global time to the scene that owns it.
    ///
    /// A time equal to a scene boundary belongs to the later scene. Times past the end resolve to
    /// the last playable scene at its final instant; negative times clamp to zero.
    pub fn resolve(&self, t: f64) -> Option<Resolved> {
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let mut last = None;
        for (index, span) in self.spans.iter().enumerate() {
            if !span.is_playable() {
                continue;
            }
            if t >= span.start && t < span.end() {
                return Some(Resolved {
                    index,
                    local_time: t - span.start,
                });
            }
            last = Some((index, span));
        }
        last.map(|(index, span)| Resolved {
            index,
            local_time: span.duration,
        })
    }

    /// Resolve `t` and compute crossfade weights for a blend window of `window` seconds.
    pub fn mix_at(&self, t: f64, window: f64) -> Option<SceneMix> {
        let current = self.resolve(t)?;
        let span = self.spans[current.index];
        let until_end = span.duration - current.local_time;
        let incoming = self.next_playable(current.index);

        if window > 0.0 && until_end < window && incoming.is_some() {
            return Some(SceneMix {
                current,
                phase: ScenePhase::CrossfadingOut,
                progress: ((window - until_end) / window).clamp(0.0, 1.0),
                incoming,
            });
        }

        let phase = if current.local_time < window {
            ScenePhase::Entering
        } else {
            ScenePhase::Steady
        };
        Some(SceneMix {
            current,
            phase,
            progress: 0.0,
            incoming: None,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/timeline.rs"]
mod tests;
