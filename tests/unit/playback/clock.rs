use super::*;

#[test]
fn manual_clock_clones_share_time() {
    let clock = ManualClock::new();
    let handle = clock.clone();
    assert_eq!(clock.now(), 0.0);
    handle.advance(1.5);
    handle.advance(0.25);
    assert_eq!(clock.now(), 1.75);
    handle.set(10.0);
    assert_eq!(clock.now(), 10.0);
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(a >= 0.0);
    assert!(b >= a);
}

#[test]
fn clock_references_delegate() {
    let clock = ManualClock::new();
    clock.set(3.0);
    fn read<C: Clock>(c: C) -> f64 {
        c.now()
    }
    assert_eq!(read(&clock), 3.0);
}
