use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::asset_load("img", "boom")
            .to_string()
            .contains("asset load error: 'img'")
    );
    assert!(
        ReelError::music_load("x")
            .to_string()
            .contains("music load error:")
    );
    assert!(ReelError::encoding("x").to_string().contains("encoding error:"));
    assert!(ReelError::mix("x").to_string().contains("mix error:"));
    assert!(
        ReelError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
}

#[test]
fn only_music_and_timing_are_non_fatal() {
    assert!(ReelError::music_load("x").is_non_fatal());
    assert!(
        ReelError::TimingInconsistency {
            scene: "s".into(),
            element: "e".into(),
            exit_start: 1.0,
            entrance_end: 2.0,
        }
        .is_non_fatal()
    );
    assert!(!ReelError::asset_load("a", "b").is_non_fatal());
    assert!(!ReelError::mix("x").is_non_fatal());
    assert!(!ReelError::encoding("x").is_non_fatal());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
