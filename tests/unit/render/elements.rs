use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn cover_fills_box_and_crops_overflow() {
    let bbox = Rect::new(0.0, 0.0, 100.0, 100.0);
    let p = place_image((200.0, 100.0), bbox, true, 1.0);
    // scale 1: the middle 100x100 of the image is visible
    assert_eq!(p.visible, Rect::new(50.0, 0.0, 150.0, 100.0));
    let tl = p.transform * kurbo::Point::new(50.0, 0.0);
    assert!(approx(tl.x, 0.0) && approx(tl.y, 0.0));
}

#[test]
fn contain_fits_inside_box() {
    let bbox = Rect::new(10.0, 20.0, 110.0, 220.0);
    let p = place_image((50.0, 50.0), bbox, false, 1.0);
    assert_eq!(p.visible, Rect::new(0.0, 0.0, 50.0, 50.0));
    let tl = p.transform * kurbo::Point::new(0.0, 0.0);
    let br = p.transform * kurbo::Point::new(50.0, 50.0);
    assert!(approx(tl.x, 10.0) && approx(br.x, 110.0));
    assert!(approx(tl.y, 70.0) && approx(br.y, 170.0));
}

#[test]
fn zoom_crops_to_the_box() {
    let bbox = Rect::new(0.0, 0.0, 100.0, 100.0);
    let p = place_image((100.0, 100.0), bbox, false, 2.0);
    assert_eq!(p.visible, Rect::new(25.0, 25.0, 75.0, 75.0));
    let small = place_image((100.0, 100.0), bbox, false, 0.5);
    assert_eq!(small.visible, Rect::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn vertical_alignment_shifts_block() {
    let bbox = Rect::new(0.0, 100.0, 50.0, 300.0);
    assert_eq!(text_top(VerticalAlign::Top, bbox, 60.0), 100.0);
    assert_eq!(text_top(VerticalAlign::Middle, bbox, 60.0), 170.0);
    assert_eq!(text_top(VerticalAlign::Bottom, bbox, 60.0), 240.0);
}
