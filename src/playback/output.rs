use crate::audio::buffer::AudioBuffer;

/// Handle of a scheduled source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// A buffer to start at a clock time.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledSource {
    /// Samples to play.
    pub buffer: AudioBuffer,
    /// Clock time (see [`super::clock::Clock`]) at which playback starts.
    pub when: f64,
    /// Offset into `buffer`, in seconds.
    pub offset: f64,
    /// Restart from the beginning when the buffer ends.
    pub looped: bool,
    /// Linear gain.
    pub gain: f32,
}

/// Live audio output the player schedules sources on.
///
/// Implementations own the sources until [`AudioOutput::stop`] is called.
pub trait AudioOutput {
    /// Schedule `source` and return a handle for stopping it.
    fn schedule(&mut self, source: ScheduledSource) -> SourceId;
    /// Stop and release a source. Unknown ids are ignored.
    fn stop(&mut self, id: SourceId);
}

/// Output that discards everything.
#[derive(Debug, Default)]
pub struct NullAudioOutput {
    next: u64,
}

impl AudioOutput for NullAudioOutput {
    fn schedule(&mut self, _source: ScheduledSource) -> SourceId {
        self.next += 1;
        SourceId(self.next)
    }

    fn stop(&mut self, _id: SourceId) {}
}

/// Output that records what was scheduled and stopped.
#[derive(Debug, Default)]
pub struct RecordingAudioOutput {
    next: u64,
    active: Vec<(SourceId, ScheduledSource)>,
    scheduled: Vec<ScheduledSource>,
    stopped: Vec<SourceId>,
}

impl RecordingAudioOutput {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources scheduled and not yet stopped, in scheduling order.
    pub fn active(&self) -> impl Iterator<Item = &ScheduledSource> {
        self.active.iter().map(|(_, s)| s)
    }

    /// Every source ever scheduled, in order.
    pub fn scheduled(&self) -> &[ScheduledSource] {
        &self.scheduled
    }

    /// Ids passed to `stop`, in order.
    pub fn stopped(&self) -> &[SourceId] {
        &self.stopped
    }
}

impl AudioOutput for RecordingAudioOutput {
    fn schedule(&mut self, source: ScheduledSource) -> SourceId {
        self.next += 1;
        let id = SourceId(self.next);
        self.scheduled.push(source.clone());
        self.active.push((id, source));
        id
    }

    fn stop(&mut self, id: SourceId) {
        self.active.retain(|(a, _)| *a != id);
        self.stopped.push(id);
    }
}

impl<O: AudioOutput + ?Sized> AudioOutput for &mut O {
    fn schedule(&mut self, source: ScheduledSource) -> SourceId {
        (**self).schedule(source)
    }

    fn stop(&mut self, id: SourceId) {
        (**self).stop(id);
    }
}
