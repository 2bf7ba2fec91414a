use super::*;

const V2_SCRIPT: &str = r##"{
  "aspectRatio": "9:16",
  "scenes": [
    {
      "id": "s1",
      "narrationSegmentId": "n1",
      "layout": "v2",
      "elements": [
        {
          "id": "bg",
          "kind": "image",
          "layout": { "x": 0, "y": 0, "width": 100, "height": 100 },
          "entrance": { "kind": "fade-in", "start": 0, "duration": 0.5 }
        },
        {
          "id": "title",
          "kind": "text",
          "text": "Hello world",
          "style": { "fontSize": 64, "color": "#ff0000", "align": "left", "verticalAlign": "middle", "weight": "bold" },
          "layout": { "x": 10, "y": 10, "width": 80, "height": 20 },
          "entrance": { "kind": "slide-in-left", "start": 0.2, "duration": 1.0 },
          "exit": { "kind": "fade-out", "start": 2.0, "duration": 0.5 }
        }
      ]
    }
  ],
  "assets": { "narration": { "n1": "audio/n1.wav" }, "images": { "bg": "img/bg.png" } }
}"##;

fn v1_scene(id: &str) -> Scene {
    Scene {
        id: id.to_string(),
        narration_segment_id: format!("{id}-n"),
        layout: SceneLayout::V1 {
            visual_description: "a lighthouse".to_string(),
            caption_text: Some("one two three".to_string()),
            image: None,
        },
    }
}

fn parsed_v2() -> Script {
    Script::from_reader(V2_SCRIPT.as_bytes()).unwrap()
}

#[test]
fn parses_v2_elements_and_styles() {
    let script = parsed_v2();
    assert_eq!(script.aspect_ratio, Some(AspectRatio::Portrait9x16));
    assert_eq!(script.layout_version(), Some(LayoutVersion::V2));

    let els = script.scenes[0].elements();
    assert_eq!(els.len(), 2);
    assert_eq!(els[0].image_asset_id(), Some("bg"));
    assert_eq!(els[0].entrance.kind, EntranceKind::FadeIn);
    assert!(els[0].exit.is_none());

    match &els[1].kind {
        ElementKind::Text { text, style } => {
            assert_eq!(text, "Hello world");
            assert_eq!(style.font_size, 64.0);
            assert_eq!(style.color, RgbaColor([255, 0, 0, 255]));
            assert_eq!(style.align, TextAlign::Left);
            assert_eq!(style.vertical_align, VerticalAlign::Middle);
            assert_eq!(style.weight, 700);
            assert_eq!(style.line_height, 1.2);
        }
        other => panic!("expected text element, got {other:?}"),
    }
    assert_eq!(els[1].exit.unwrap().kind, ExitKind::FadeOut);
    assert!((els[1].entrance_end() - 1.2).abs() < 1e-9);
    assert_eq!(script.assets.narration["n1"], "audio/n1.wav");
    script.validate().unwrap();
}

#[test]
fn parses_v1_scene_with_image_default() {
    let json = r#"{"scenes":[{"id":"a","narrationSegmentId":"na","layout":"v1","visualDescription":"sky","captionText":"hi there"}]}"#;
    let script = Script::from_reader(json.as_bytes()).unwrap();
    assert_eq!(script.layout_version(), Some(LayoutVersion::V1));
    assert_eq!(script.scenes[0].v1_image_id(), Some("a"));
    assert!(script.scenes[0].elements().is_empty());
    assert!(script.aspect_ratio.is_none());
    script.validate().unwrap();
}

#[test]
fn unknown_layout_tag_is_a_serde_error() {
    let json = r#"{"scenes":[{"id":"a","narrationSegmentId":"na","layout":"v3"}]}"#;
    let err = Script::from_reader(json.as_bytes()).unwrap_err();
    assert!(matches!(err, ReelError::Serde(_)));
}

#[test]
fn json_round_trip_preserves_script() {
    let script = parsed_v2();
    let again = Script::from_reader(script.to_json_pretty().unwrap().as_bytes()).unwrap();
    assert_eq!(script, again);
}

#[test]
fn validate_rejects_duplicate_scene_ids() {
    let script = Script {
        aspect_ratio: None,
        scenes: vec![v1_scene("a"), v1_scene("a")],
        assets: AssetSources::default(),
    };
    let err = script.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate scene id"));
}

#[test]
fn validate_rejects_mixed_layouts() {
    let mut script = parsed_v2();
    script.scenes.push(v1_scene("b"));
    let err = script.validate().unwrap_err();
    assert!(err.to_string().contains("layout versions"));
}

#[test]
fn validate_rejects_out_of_range_box_and_negative_timing() {
    let mut script = parsed_v2();
    if let SceneLayout::V2 { elements } = &mut script.scenes[0].layout {
        elements[1].layout.width = 120.0;
    }
    assert!(script.validate().is_err());

    let mut script = parsed_v2();
    if let SceneLayout::V2 { elements } = &mut script.scenes[0].layout {
        elements[0].entrance.duration = -1.0;
    }
    assert!(script.validate().is_err());
}

#[test]
fn overlapping_exit_is_reported_not_rejected() {
    let mut script = parsed_v2();
    if let SceneLayout::V2 { elements } = &mut script.scenes[0].layout {
        elements[1].exit = Some(Exit {
            kind: ExitKind::SlideOutRight,
            start: 0.5,
            duration: 0.5,
        });
    }
    script.validate().unwrap();
    let issues = script.timing_issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].is_non_fatal());
    match &issues[0] {
        ReelError::TimingInconsistency {
            scene,
            element,
            exit_start,
            entrance_end,
        } => {
            assert_eq!(scene, "s1");
            assert_eq!(element, "title");
            assert_eq!(*exit_start, 0.5);
            assert!((*entrance_end - 1.2).abs() < 1e-9);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(parsed_v2().timing_issues().is_empty());
}

#[test]
fn box_layout_resolves_to_pixels() {
    let canvas = Canvas {
        width: 1280,
        height: 720,
    };
    let r = BoxLayout {
        x: 10.0,
        y: 50.0,
        width: 50.0,
        height: 25.0,
    }
    .to_rect(canvas);
    assert_eq!(r, Rect::new(128.0, 360.0, 768.0, 540.0));
    assert_eq!(BoxLayout::FULL.to_rect(canvas), canvas.rect());
}

#[test]
fn narration_segment_can_be_replaced() {
    let mut script = Script {
        aspect_ratio: None,
        scenes: vec![v1_scene("a")],
        assets: AssetSources::default(),
    };
    script.set_narration_segment("a", "fresh").unwrap();
    assert_eq!(script.scenes[0].narration_segment_id, "fresh");
    assert!(script.set_narration_segment("zzz", "x").is_err());
}
