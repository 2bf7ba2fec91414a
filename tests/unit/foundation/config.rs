use super::*;

#[test]
fn empty_json_yields_defaults() {
    let cfg = EngineConfig::from_reader("{}".as_bytes()).unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(cfg.sample_rate, 24_000);
    assert_eq!(cfg.fps.num, 30);
    assert_eq!(cfg.video_bitrate, 8_000_000);
    assert!((cfg.music_gain - 0.2).abs() < 1e-6);
}

#[test]
fn camel_case_overrides_apply() {
    let cfg =
        EngineConfig::from_reader(r#"{"aspectRatio":"9:16","musicGain":0.5}"#.as_bytes()).unwrap();
    let ctx = EngineContext::from_config(&cfg).unwrap();
    assert_eq!(ctx.canvas.width, 720);
    assert_eq!(ctx.canvas.height, 1280);
    assert!((ctx.music_gain - 0.5).abs() < 1e-6);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(EngineConfig::from_reader(r#"{"sampleRate":0}"#.as_bytes()).is_err());
    assert!(EngineConfig::from_reader(r#"{"musicGain":1.5}"#.as_bytes()).is_err());
    assert!(EngineConfig::from_reader(r#"{"transitionDuration":0}"#.as_bytes()).is_err());
    assert!(EngineConfig::from_reader(r#"{"channels":6}"#.as_bytes()).is_err());
}
