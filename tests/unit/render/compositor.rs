use super::*;
use crate::audio::buffer::AudioBuffer;
use crate::foundation::core::{AspectRatio, Rgba8Premul};
use crate::foundation::error::ReelError;
use crate::script::model::{
    AssetSources, BoxLayout, Element, ElementKind, Entrance, EntranceKind, SceneLayout,
    TextStyle, VerticalAlign,
};

fn solid(r: u8, g: u8, b: u8) -> RasterImage {
    RasterImage::solid(32, 18, Rgba8Premul::from_straight_rgba(r, g, b, 255)).unwrap()
}

fn small_ctx() -> EngineContext {
    EngineContext::default().with_canvas(Canvas {
        width: 64,
        height: 36,
    })
}

fn v1_scene(id: &str) -> Scene {
    Scene {
        id: id.to_string(),
        narration_segment_id: format!("{id}-n"),
        layout: SceneLayout::V1 {
            visual_description: String::new(),
            caption_text: None,
            image: None,
        },
    }
}

fn two_scene_v1() -> (Script, AssetStore) {
    let script = Script {
        aspect_ratio: None,
        scenes: vec![v1_scene("a"), v1_scene("b")],
        assets: AssetSources::default(),
    };
    let mut store = AssetStore::new();
    store.insert_image("a", solid(255, 0, 0));
    store.insert_image("b", solid(0, 0, 255));
    store.insert_narration("a-n", AudioBuffer::silence(24_000, 3.0).unwrap());
    store.insert_narration("b-n", AudioBuffer::silence(24_000, 4.0).unwrap());
    (script, store)
}

fn near(px: [u8; 4], want: [u8; 4], tol: i32) -> bool {
    px.iter()
        .zip(want)
        .all(|(&a, b)| (i32::from(a) - i32::from(b)).abs() <= tol)
}

#[test]
fn master_fade_covers_head_and_tail() {
    assert_eq!(master_fade(0.0, 10.0, 0.5), 1.0);
    assert!((master_fade(0.25, 10.0, 0.5) - 0.5).abs() < 1e-9);
    assert_eq!(master_fade(5.0, 10.0, 0.5), 0.0);
    assert!((master_fade(9.75, 10.0, 0.5) - 0.5).abs() < 1e-9);
    assert_eq!(master_fade(10.0, 10.0, 0.5), 1.0);
    assert_eq!(master_fade(1.0, 0.0, 0.5), 0.0);
}

#[test]
fn watermark_cycles_corners_and_fades() {
    let canvas = AspectRatio::Landscape16x9.canvas();
    let (r0, o0) = watermark_placement(2.0, canvas, (100.0, 50.0));
    assert!(r0.x0 < 100.0 && r0.y0 < 100.0);
    assert!((o0 - WATERMARK_MAX_OPACITY).abs() < 1e-9);
    assert!((r0.width() - 192.0).abs() < 1e-9);
    assert!((r0.height() - 96.0).abs() < 1e-9);

    let (r1, _) = watermark_placement(7.0, canvas, (100.0, 50.0));
    assert!(r1.x1 > 1200.0 && r1.y0 < 100.0);
    let (r2, _) = watermark_placement(12.0, canvas, (100.0, 50.0));
    assert!(r2.x1 > 1200.0 && r2.y1 > 650.0);
    let (r3, _) = watermark_placement(17.0, canvas, (100.0, 50.0));
    assert!(r3.x0 < 100.0 && r3.y1 > 650.0);
    let (again, _) = watermark_placement(22.0, canvas, (100.0, 50.0));
    assert_eq!(again, r0);

    let (_, edge) = watermark_placement(5.0, canvas, (100.0, 50.0));
    assert_eq!(edge, 0.0);
    let (_, half_in) = watermark_placement(5.125, canvas, (100.0, 50.0));
    assert!((half_in - 0.4).abs() < 1e-9);
    let (_, half_out) = watermark_placement(4.875, canvas, (100.0, 50.0));
    assert!((half_out - 0.4).abs() < 1e-9);
}

#[test]
fn script_aspect_overrides_context_canvas() {
    let (mut script, _) = two_scene_v1();
    assert_eq!(canvas_for(&small_ctx(), &script).width, 64);
    script.aspect_ratio = Some(AspectRatio::Square1x1);
    assert_eq!(canvas_for(&small_ctx(), &script).width, 1080);
}

#[test]
fn v1_steady_frame_shows_scene_image() {
    let (script, store) = two_scene_v1();
    let frame = render_frame(&small_ctx(), 1.0, &script, &store).unwrap();
    assert_eq!((frame.width, frame.height), (64, 36));
    assert!(frame.premultiplied);
    assert!(near(frame.pixel(32, 18).unwrap(), [255, 0, 0, 255], 3));
}

#[test]
fn v1_crossfade_blends_outgoing_and_incoming() {
    let (script, store) = two_scene_v1();
    let frame = render_frame(&small_ctx(), 2.8, &script, &store).unwrap();
    // 0.4 red + 0.6 blue over black
    assert!(near(frame.pixel(32, 18).unwrap(), [102, 0, 153, 255], 6));

    let frame = render_frame(&small_ctx(), 3.5, &script, &store).unwrap();
    assert!(near(frame.pixel(32, 18).unwrap(), [0, 0, 255, 255], 3));
}

#[test]
fn rendering_is_deterministic_and_cache_follows_replacements() {
    let (script, mut store) = two_scene_v1();
    let mut comp = Compositor::new(small_ctx(), RenderMode::Export);
    let a = comp.render_frame(1.2, &script, &store).unwrap();
    let b = comp.render_frame(1.2, &script, &store).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, render_frame(&small_ctx(), 1.2, &script, &store).unwrap());

    store.replace_image("a", solid(0, 255, 0));
    let c = comp.render_frame(1.2, &script, &store).unwrap();
    assert!(near(c.pixel(32, 18).unwrap(), [0, 255, 0, 255], 3));
}

#[test]
fn v2_background_respects_master_fade() {
    let script = Script {
        aspect_ratio: None,
        scenes: vec![Scene {
            id: "s".to_string(),
            narration_segment_id: "n".to_string(),
            layout: SceneLayout::V2 {
                elements: vec![Element {
                    id: "bg".to_string(),
                    kind: ElementKind::Image { asset: None },
                    layout: BoxLayout::FULL,
                    entrance: Entrance {
                        kind: EntranceKind::None,
                        start: 0.0,
                        duration: 0.0,
                    },
                    exit: None,
                }],
            },
        }],
        assets: AssetSources::default(),
    };
    let mut store = AssetStore::new();
    store.insert_image("bg", solid(0, 200, 0));
    store.insert_narration("n", AudioBuffer::silence(24_000, 3.0).unwrap());

    let mid = render_frame(&small_ctx(), 1.5, &script, &store).unwrap();
    assert!(near(mid.pixel(32, 18).unwrap(), [0, 200, 0, 255], 3));
    let head = render_frame(&small_ctx(), 0.25, &script, &store).unwrap();
    assert!(near(head.pixel(32, 18).unwrap(), [0, 100, 0, 255], 4));
}

fn image_element(id: &str, entrance: EntranceKind, duration: f64) -> Element {
    Element {
        id: id.to_string(),
        kind: ElementKind::Image { asset: None },
        layout: BoxLayout::FULL,
        entrance: Entrance {
            kind: entrance,
            start: 0.0,
            duration,
        },
        exit: None,
    }
}

fn v2_scene(id: &str, elements: Vec<Element>) -> Scene {
    Scene {
        id: id.to_string(),
        narration_segment_id: format!("{id}-n"),
        layout: SceneLayout::V2 { elements },
    }
}

#[test]
fn v2_crossfade_draws_next_scene_from_its_start() {
    let script = Script {
        aspect_ratio: None,
        scenes: vec![
            v2_scene("a", vec![image_element("green", EntranceKind::None, 0.0)]),
            v2_scene(
                "b",
                vec![
                    image_element("blue", EntranceKind::None, 0.0),
                    image_element("late", EntranceKind::FadeIn, 1.0),
                ],
            ),
        ],
        assets: AssetSources::default(),
    };
    let mut store = AssetStore::new();
    store.insert_image("green", solid(0, 200, 0));
    store.insert_image("blue", solid(0, 0, 255));
    store.insert_image("late", solid(255, 0, 0));
    store.insert_narration("a-n", AudioBuffer::silence(24_000, 3.0).unwrap());
    store.insert_narration("b-n", AudioBuffer::silence(24_000, 4.0).unwrap());

    // halfway through the last fade window of scene a; "late" has not started fading in yet
    let frame = render_frame(&small_ctx(), 2.75, &script, &store).unwrap();
    assert!(near(frame.pixel(32, 18).unwrap(), [0, 100, 128, 255], 6));

    let before = render_frame(&small_ctx(), 2.0, &script, &store).unwrap();
    assert!(near(before.pixel(32, 18).unwrap(), [0, 200, 0, 255], 3));
}

fn system_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
}

/// First and last rows holding a bright pixel.
fn lit_rows(frame: &FrameRGBA) -> Option<(u32, u32)> {
    let rows: Vec<u32> = (0..frame.height)
        .filter(|&y| {
            (0..frame.width).any(|x| frame.pixel(x, y).is_some_and(|px| px[0] > 128))
        })
        .collect();
    Some((*rows.first()?, *rows.last()?))
}

#[test]
fn v2_text_wraps_and_honors_vertical_alignment() {
    let Some(bytes) = system_font() else {
        return;
    };
    let ctx = EngineContext::default().with_canvas(Canvas {
        width: 320,
        height: 180,
    });
    let text_scene = |align: VerticalAlign| {
        v2_scene(
            "t",
            vec![Element {
                id: "caption".to_string(),
                kind: ElementKind::Text {
                    text: "short words wrap here".to_string(),
                    style: TextStyle {
                        font_size: 20.0,
                        vertical_align: align,
                        ..TextStyle::default()
                    },
                },
                layout: BoxLayout {
                    x: 25.0,
                    y: 0.0,
                    width: 30.0,
                    height: 100.0,
                },
                entrance: Entrance::default(),
                exit: None,
            }],
        )
    };
    let mut store = AssetStore::new();
    store.insert_font("Sans", bytes);
    store.insert_narration("t-n", AudioBuffer::silence(24_000, 4.0).unwrap());
    let render = |align| {
        let script = Script {
            aspect_ratio: None,
            scenes: vec![text_scene(align)],
            assets: AssetSources::default(),
        };
        render_frame(&ctx, 2.0, &script, &store).unwrap()
    };

    let (top, bottom) = lit_rows(&render(VerticalAlign::Bottom)).unwrap();
    // 96px wide box: more than one 24px line
    assert!(bottom - top > 30, "block spans {top}..{bottom}");
    assert!(bottom > 160 && top > 60);

    let (mid_top, mid_bottom) = lit_rows(&render(VerticalAlign::Middle)).unwrap();
    let center = f64::from(mid_top + mid_bottom) / 2.0;
    assert!((center - 90.0).abs() < 12.0, "block centered at {center}");
    assert!(mid_bottom < bottom);
}

#[test]
fn foreign_timeline_is_an_evaluation_error() {
    let (script, store) = two_scene_v1();
    let timeline = Timeline::from_durations([3.0, 4.0, 5.0]);
    let mut comp = Compositor::new(small_ctx(), RenderMode::Preview);
    let err = comp
        .render_frame_with(&timeline, 9.0, &script, &store)
        .unwrap_err();
    assert!(matches!(err, ReelError::Evaluation(_)));
}

#[test]
fn empty_script_renders_black() {
    let script = Script {
        aspect_ratio: None,
        scenes: Vec::new(),
        assets: AssetSources::default(),
    };
    let frame = render_frame(&small_ctx(), 0.0, &script, &AssetStore::new()).unwrap();
    assert_eq!(frame.mean_rgba(), [0.0, 0.0, 0.0, 255.0]);
}
