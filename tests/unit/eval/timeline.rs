use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn spans_are_cumulative_and_skip_nothing() {
    let tl = Timeline::from_durations([3.0, 0.0, 4.0, f64::NAN, -1.0]);
    assert_eq!(tl.spans().len(), 5);
    assert!(approx(tl.total_duration(), 7.0));
    assert_eq!(tl.span(2).unwrap().start, 3.0);
    assert!(!tl.span(1).unwrap().is_playable());
    assert_eq!(tl.span(4).unwrap().duration, 0.0);
}

#[test]
fn boundary_belongs_to_later_scene_and_zero_length_is_skipped() {
    let tl = Timeline::from_durations([3.0, 0.0, 4.0]);
    assert_eq!(tl.resolve(0.0).unwrap().index, 0);
    assert_eq!(tl.resolve(2.999).unwrap().index, 0);
    let r = tl.resolve(3.0).unwrap();
    assert_eq!(r.index, 2);
    assert!(approx(r.local_time, 0.0));
    assert_eq!(tl.next_playable(0), Some(2));
    assert_eq!(tl.next_playable(2), None);
}

#[test]
fn out_of_range_times_clamp() {
    let tl = Timeline::from_durations([3.0, 4.0]);
    assert_eq!(tl.resolve(-2.0).unwrap().index, 0);
    let end = tl.resolve(100.0).unwrap();
    assert_eq!(end.index, 1);
    assert!(approx(end.local_time, 4.0));
    assert!(Timeline::from_durations([0.0]).resolve(0.0).is_none());
    assert!(Timeline::default().is_empty());
}

#[test]
fn crossfade_weights_near_scene_end() {
    let tl = Timeline::from_durations([3.0, 4.0]);

    let mix = tl.mix_at(2.8, 0.5).unwrap();
    assert_eq!(mix.phase, ScenePhase::CrossfadingOut);
    assert_eq!(mix.incoming, Some(1));
    assert!(approx(mix.progress, 0.6));
    assert!(approx(mix.outgoing_alpha(), 0.4));
    assert!(approx(mix.incoming_alpha(), 0.6));

    let mix = tl.mix_at(2.4, 0.5).unwrap();
    assert_eq!(mix.phase, ScenePhase::Steady);
    assert!(mix.incoming.is_none());
    assert!(approx(mix.outgoing_alpha(), 1.0));
    assert!(approx(mix.incoming_alpha(), 0.0));
}

#[test]
fn last_scene_never_crossfades_and_phases_progress() {
    let tl = Timeline::from_durations([3.0, 4.0]);
    assert_eq!(tl.mix_at(3.2, 0.5).unwrap().phase, ScenePhase::Entering);
    assert_eq!(tl.mix_at(4.0, 0.5).unwrap().phase, ScenePhase::Steady);
    let tail = tl.mix_at(6.9, 0.5).unwrap();
    assert_eq!(tail.phase, ScenePhase::Steady);
    assert!(tail.incoming.is_none());
}

#[test]
fn exactly_one_scene_owns_each_instant() {
    let tl = Timeline::from_durations([1.5, 2.25, 0.0, 0.75]);
    let mut t = 0.0;
    while t < tl.total_duration() {
        let r = tl.resolve(t).unwrap();
        let owners = tl
            .spans()
            .iter()
            .filter(|s| s.is_playable() && t >= s.start && t < s.end())
            .count();
        assert_eq!(owners, 1);
        let span = tl.span(r.index).unwrap();
        assert!(t >= span.start && t < span.end());
        t += 0.01;
    }
}
