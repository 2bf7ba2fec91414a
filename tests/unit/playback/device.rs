use super::*;
use crate::audio::buffer::AudioBuffer;

fn source(when: f64, offset: f64, looped: bool) -> ScheduledSource {
    ScheduledSource {
        buffer: AudioBuffer::silence(8_000, 4.0).unwrap(),
        when,
        offset,
        looped,
        gain: 1.0,
    }
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

#[test]
fn future_start_waits_and_keeps_offset() {
    let plan = StartPlan::for_source(&source(12.5, 0.75, false), 10.0);
    assert!((secs(plan.delay) - 2.5).abs() < 1e-9);
    assert!((secs(plan.skip) - 0.75).abs() < 1e-9);
}

#[test]
fn late_start_skips_the_missed_audio() {
    let plan = StartPlan::for_source(&source(9.0, 0.5, false), 10.0);
    assert_eq!(plan.delay, Duration::ZERO);
    assert!((secs(plan.skip) - 1.5).abs() < 1e-9);
}

#[test]
fn looped_skip_wraps_around_the_buffer() {
    let plan = StartPlan::for_source(&source(10.0, 9.0, true), 10.0);
    assert!((secs(plan.skip) - 1.0).abs() < 1e-9);

    let once = StartPlan::for_source(&source(10.0, 9.0, false), 10.0);
    assert!((secs(once.skip) - 9.0).abs() < 1e-9);
}
