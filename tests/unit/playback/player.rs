use super::*;
use crate::assets::decode::RasterImage;
use crate::audio::buffer::AudioBuffer;
use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::playback::clock::ManualClock;
use crate::playback::output::RecordingAudioOutput;
use crate::script::model::{AssetSources, Scene, SceneLayout};

fn ctx() -> EngineContext {
    EngineContext::default().with_canvas(Canvas {
        width: 32,
        height: 18,
    })
}

fn fixture(music_secs: Option<f64>) -> (Script, AssetStore) {
    let scene = |id: &str| Scene {
        id: id.to_string(),
        narration_segment_id: format!("{id}-n"),
        layout: SceneLayout::V1 {
            visual_description: String::new(),
            caption_text: None,
            image: None,
        },
    };
    let script = Script {
        aspect_ratio: None,
        scenes: vec![scene("a"), scene("b")],
        assets: AssetSources::default(),
    };
    let mut store = AssetStore::new();
    let px = Rgba8Premul::from_straight_rgba(200, 10, 10, 255);
    store.insert_image("a", RasterImage::solid(16, 9, px).unwrap());
    store.insert_image("b", RasterImage::solid(16, 9, px).unwrap());
    store.insert_narration("a-n", AudioBuffer::silence(24_000, 3.0).unwrap());
    store.insert_narration("b-n", AudioBuffer::silence(24_000, 4.0).unwrap());
    if let Some(secs) = music_secs {
        store.set_music(Some(AudioBuffer::silence(24_000, secs).unwrap()));
    }
    (script, store)
}

#[test]
fn play_schedules_narration_at_scene_starts_and_music_from_zero() {
    let (script, store) = fixture(Some(10.0));
    let clock = ManualClock::new();
    clock.set(100.0);
    let mut out = RecordingAudioOutput::new();
    let mut player = PlaybackClock::new(&script, &store, ctx(), clock.clone(), &mut out);
    player.play();
    assert!(player.state().is_playing);
    assert_eq!(player.scheduled_sources(), 3);

    let scheduled = player.output().scheduled().to_vec();
    assert_eq!(scheduled[0].when, 100.0);
    assert_eq!(scheduled[1].when, 103.0);
    assert!(!scheduled[0].looped);
    let music = &scheduled[2];
    assert!(music.looped);
    assert_eq!(music.offset, 0.0);
    assert!((music.gain - 0.2).abs() < 1e-6);
}

#[test]
fn ticks_follow_the_clock_and_resolve_the_active_scene() {
    let (script, store) = fixture(None);
    let clock = ManualClock::new();
    let mut player =
        PlaybackClock::new(&script, &store, ctx(), clock.clone(), RecordingAudioOutput::new());
    player.play();

    clock.advance(1.0);
    let out = player.tick().unwrap();
    assert_eq!(player.state().current_time, 1.0);
    assert_eq!(player.state().active_scene_index, Some(0));
    assert!((out.progress - 1.0 / 7.0).abs() < 1e-9);
    assert!(!out.finished);
    assert_eq!((out.frame.width, out.frame.height), (32, 18));

    clock.advance(2.5);
    player.tick().unwrap();
    assert_eq!(player.state().active_scene_index, Some(1));
}

#[test]
fn seek_skips_narrations_that_already_started() {
    let (script, store) = fixture(Some(2.0));
    let clock = ManualClock::new();
    let mut out = RecordingAudioOutput::new();
    {
        let mut player = PlaybackClock::new(&script, &store, ctx(), clock.clone(), &mut out);
        player.play();
        player.seek(3.5);
        assert_eq!(player.state().current_time, 3.5);
        assert_eq!(player.state().active_scene_index, Some(1));
        // both narrations started in the past; only music remains, phase-aligned
        assert_eq!(player.scheduled_sources(), 1);
        let music: Vec<_> = player.output().active().collect();
        assert_eq!(music.len(), 1);
        assert!((music[0].offset - 1.5).abs() < 1e-9);

        player.seek(3.0);
        let active: Vec<_> = player.output().active().cloned().collect();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].when, 0.0);
        assert_eq!(active[0].buffer.duration_secs(), 4.0);
    }
    assert_eq!(out.stopped().len(), 6);
    assert_eq!(out.active().count(), 0);
}

#[test]
fn reaching_the_end_stops_at_total() {
    let (script, store) = fixture(None);
    let clock = ManualClock::new();
    let mut player =
        PlaybackClock::new(&script, &store, ctx(), clock.clone(), RecordingAudioOutput::new());
    player.play();
    clock.advance(8.0);
    let out = player.tick().unwrap();
    assert!(out.finished);
    assert_eq!(out.progress, 1.0);
    let state = player.state();
    assert!(!state.is_playing);
    assert_eq!(state.current_time, 7.0);
    assert_eq!(state.active_scene_index, Some(1));
    assert_eq!(player.scheduled_sources(), 0);

    // a later tick while stopped neither moves nor re-finishes
    clock.advance(1.0);
    assert!(!player.tick().unwrap().finished);
    assert_eq!(player.state().current_time, 7.0);

    player.play();
    assert_eq!(player.state().current_time, 0.0);
    assert!(player.state().is_playing);
}

#[test]
fn pause_toggle_and_stop() {
    let (script, store) = fixture(Some(10.0));
    let clock = ManualClock::new();
    let mut player =
        PlaybackClock::new(&script, &store, ctx(), clock.clone(), RecordingAudioOutput::new());
    player.toggle();
    clock.advance(2.0);
    player.toggle();
    assert!(!player.state().is_playing);
    assert_eq!(player.state().current_time, 2.0);
    assert_eq!(player.scheduled_sources(), 0);

    clock.advance(5.0);
    player.tick().unwrap();
    assert_eq!(player.state().current_time, 2.0);

    player.play();
    let music = player.output().active().last().cloned().unwrap();
    assert!(music.looped);
    assert_eq!(music.offset, 2.0);
    // scene a already started; only b's narration and music
    assert_eq!(player.scheduled_sources(), 2);

    clock.advance(0.5);
    player.stop();
    assert_eq!(player.state(), PlaybackState {
        is_playing: false,
        current_time: 0.0,
        active_scene_index: Some(0),
    });
    assert_eq!(player.output().active().count(), 0);
}

#[test]
fn seek_clamps_into_the_timeline() {
    let (script, store) = fixture(None);
    let mut player = PlaybackClock::new(
        &script,
        &store,
        ctx(),
        ManualClock::new(),
        RecordingAudioOutput::new(),
    );
    player.seek(-3.0);
    assert_eq!(player.state().current_time, 0.0);
    player.seek(99.0);
    assert_eq!(player.state().current_time, 7.0);
    player.seek(f64::NAN);
    assert_eq!(player.state().current_time, 0.0);
    assert_eq!(player.scheduled_sources(), 0);
}
