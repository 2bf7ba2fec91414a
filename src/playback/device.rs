//! Audio output on the default sound device.
//!
//! The device output needs the `live-audio` feature (it links the platform audio stack through
//! `rodio`). [`StartPlan`] is always available so the timing arithmetic can be checked without a
//! device.

use std::time::Duration;

use crate::playback::output::ScheduledSource;

/// When a scheduled source should start, relative to now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartPlan {
    /// Silence before the first sample.
    pub delay: Duration,
    /// Audio skipped at the head of the buffer.
    pub skip: Duration,
}

impl StartPlan {
    /// Plan for `source` scheduled at clock time `now`.
    ///
    /// A start time already in the past is caught up by skipping further into the buffer.
    /// Looped sources wrap the skip around the buffer length.
    pub fn for_source(source: &ScheduledSource, now: f64) -> Self {
        let lead = source.when - now;
        let mut skip = source.offset.max(0.0) + (-lead).max(0.0);
        let len = source.buffer.duration_secs();
        if source.looped && len > 0.0 {
            skip %= len;
        }
        Self {
            delay: Duration::from_secs_f64(lead.max(0.0)),
            skip: Duration::from_secs_f64(skip),
        }
    }
}

#[cfg(feature = "live-audio")]
pub use live::DeviceAudioOutput;

#[cfg(feature = "live-audio")]
mod live {
    use std::collections::HashMap;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};

    use super::StartPlan;
    use crate::foundation::error::ReelResult;
    use crate::playback::clock::Clock;
    use crate::playback::output::{AudioOutput, ScheduledSource, SourceId};

    /// [`AudioOutput`] that plays on the default device, one `rodio` sink per source.
    ///
    /// `clock` must be the clock the player runs on, so `when` is read on the same time base.
    pub struct DeviceAudioOutput<C: Clock> {
        stream: OutputStream,
        sinks: HashMap<SourceId, Sink>,
        clock: C,
        next: u64,
    }

    impl<C: Clock> DeviceAudioOutput<C> {
        /// Open the default output device.
        pub fn open(clock: C) -> ReelResult<Self> {
            let stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| anyhow::anyhow!("open default audio device: {e}"))?;
            Ok(Self {
                stream,
                sinks: HashMap::new(),
                clock,
                next: 0,
            })
        }

        /// Number of sources currently held.
        pub fn active(&self) -> usize {
            self.sinks.len()
        }
    }

    impl<C: Clock> AudioOutput for DeviceAudioOutput<C> {
        fn schedule(&mut self, source: ScheduledSource) -> SourceId {
            self.next += 1;
            let id = SourceId(self.next);
            let plan = StartPlan::for_source(&source, self.clock.now());
            let buffer = &source.buffer;
            let samples = SamplesBuffer::new(
                buffer.channels(),
                buffer.sample_rate(),
                buffer.samples().to_vec(),
            );

            let sink = Sink::connect_new(self.stream.mixer());
            if source.looped {
                sink.append(
                    samples
                        .repeat_infinite()
                        .skip_duration(plan.skip)
                        .delay(plan.delay),
                );
            } else {
                sink.append(samples.skip_duration(plan.skip).delay(plan.delay));
            }
            sink.set_volume(source.gain);
            sink.play();
            tracing::debug!(
                id = id.0,
                delay = plan.delay.as_secs_f64(),
                skip = plan.skip.as_secs_f64(),
                looped = source.looped,
                "audio source scheduled"
            );
            self.sinks.insert(id, sink);
            id
        }

        fn stop(&mut self, id: SourceId) {
            if let Some(sink) = self.sinks.remove(&id) {
                sink.stop();
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/device.rs"]
mod tests;
