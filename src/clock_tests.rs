use super::*;

#[test]
fn starts_at_zero() {
    assert_eq!(LamportClock::new().current(), 0);
}

#[test]
fn tick_increments_by_one() {
    let mut clock = LamportClock::new();

    assert_eq!(clock.tick(), Some(1));
    assert_eq!(clock.tick(), Some(2));
    assert_eq!(clock.current(), 2);
}

#[test]
fn observe_jumps_past_larger_remote() {
    let mut clock = LamportClock::new();
    clock.tick();

    assert_eq!(clock.observe(10), Some(11));
}

#[test]
fn observe_smaller_remote_still_advances() {
    let mut clock = LamportClock::new();
    clock.observe(7);

    assert_eq!(clock.observe(3), Some(9));
}

#[test]
fn observe_equal_remote_ends_strictly_greater() {
    let mut clock = LamportClock::new();
    clock.observe(4);

    assert_eq!(clock.observe(5), Some(6));
    assert!(clock.current() > 5);
}

#[test]
fn observe_refuses_to_wrap() {
    let mut clock = LamportClock::new();
    clock.observe(3);

    assert_eq!(clock.observe(u64::MAX), None);
    assert_eq!(clock.current(), 4);
}

#[test]
fn tick_refuses_to_wrap() {
    let mut clock = LamportClock::new();
    clock.observe(u64::MAX - 1);

    assert_eq!(clock.tick(), None);
    assert_eq!(clock.current(), u64::MAX);
}
