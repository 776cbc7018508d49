#![allow(clippy::float_cmp)]

use super::*;

fn sent(decision: Decision) -> MovementVector {
    match decision {
        Decision::Send(v) => v,
        Decision::Skip(reason) => panic!("expected send, got skip: {reason:?}"),
    }
}

/// Decide and, on send, record the command as accepted.
fn step(d: &mut Dispatcher, v: MovementVector, now: u64) -> Decision {
    let decision = d.decide(v, now, true).unwrap();
    if let Decision::Send(cmd) = decision {
        d.record_sent(cmd, now);
    }
    decision
}

// =============================================================
// First send
// =============================================================

#[test]
fn empty_cache_always_sends() {
    let d = Dispatcher::default();
    assert!(d.cache().is_empty());
    for v in [MovementVector::STOP, MovementVector::new(0.5, 10.0), MovementVector::new(-1.0, -90.0)] {
        assert!(matches!(d.decide(v, 0, true).unwrap(), Decision::Send(_)));
    }
}

#[test]
fn first_stop_is_sent() {
    let d = Dispatcher::default();
    assert_eq!(sent(d.decide(MovementVector::STOP, 1_000, true).unwrap()), MovementVector::STOP);
}

// =============================================================
// Epsilon suppression and refresh
// =============================================================

#[test]
fn small_changes_inside_interval_are_suppressed() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.5, 10.0), 0);
    let second = step(&mut d, MovementVector::new(0.515, 12.9), 100);
    assert_eq!(second, Decision::Skip(SkipReason::Unchanged));
    assert_eq!(d.cache().last_send_ms, 0);
}

#[test]
fn angle_change_beyond_epsilon_sends() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.5, 10.0), 0);
    assert!(matches!(step(&mut d, MovementVector::new(0.5, 13.2), 10), Decision::Send(_)));
}

#[test]
fn velocity_change_beyond_epsilon_sends() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.5, 10.0), 0);
    assert!(matches!(step(&mut d, MovementVector::new(0.53, 10.0), 10), Decision::Send(_)));
}

#[test]
fn identical_vector_is_refreshed_after_interval() {
    let mut d = Dispatcher::default();
    let v = MovementVector::new(0.4, 20.0);
    step(&mut d, v, 1_000);
    assert_eq!(step(&mut d, v, 1_249), Decision::Skip(SkipReason::Unchanged));
    assert!(matches!(step(&mut d, v, 1_250), Decision::Send(_)));
    assert_eq!(d.cache().last_send_ms, 1_250);
}

#[test]
fn example_scenario_first_suppressed_then_resent() {
    let mut d = Dispatcher::default();
    let v = crate::shaper::shape(crate::shaper::NormalizedAxes::new(0.9, 0.9), 0.15, 1.0);
    assert!(matches!(step(&mut d, v, 0), Decision::Send(_)));
    assert_eq!(step(&mut d, v, 100), Decision::Skip(SkipReason::Unchanged));
    assert!(matches!(step(&mut d, v, 300), Decision::Send(_)));
}

// =============================================================
// Stops
// =============================================================

#[test]
fn repeated_stop_is_suppressed_even_after_interval() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::STOP, 0);
    assert_eq!(step(&mut d, MovementVector::STOP, 10_000), Decision::Skip(SkipReason::AlreadyStopped));
}

#[test]
fn stop_after_movement_is_sent() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.8, 0.0), 0);
    assert_eq!(sent(step(&mut d, MovementVector::STOP, 5)), MovementVector::STOP);
}

#[test]
fn stop_after_rotation_is_sent() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.0, 90.0), 0);
    assert!(matches!(step(&mut d, MovementVector::STOP, 5), Decision::Send(_)));
}

#[test]
fn forced_stop_is_zero() {
    let d = Dispatcher::default();
    assert_eq!(d.forced_stop(), MovementVector::STOP);
}

// =============================================================
// Gating and validation
// =============================================================

#[test]
fn disabled_never_sends() {
    let d = Dispatcher::default();
    assert_eq!(
        d.decide(MovementVector::new(1.0, 0.0), 0, false).unwrap(),
        Decision::Skip(SkipReason::Disabled)
    );
}

#[test]
fn nan_is_rejected_without_touching_cache() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.3, 0.0), 0);
    let before = *d.cache();
    let err = d.decide(MovementVector::new(f64::NAN, 0.0), 500, true).unwrap_err();
    assert!(matches!(err, DispatchError::NonFinite { .. }));
    assert_eq!(*d.cache(), before);
}

#[test]
fn failed_send_leaves_cache_untouched() {
    let mut d = Dispatcher::default();
    step(&mut d, MovementVector::new(0.3, 0.0), 0);
    // A send decision that is never recorded models a transport failure.
    assert!(matches!(d.decide(MovementVector::new(0.9, 0.0), 50, true).unwrap(), Decision::Send(_)));
    assert_eq!(d.cache().last_velocity, Some(0.3));
    assert!(matches!(d.decide(MovementVector::new(0.9, 0.0), 60, true).unwrap(), Decision::Send(_)));
}

// =============================================================
// Rounding
// =============================================================

#[test]
fn rounding_precision() {
    let r = round_command(MovementVector::new(0.123_456, 45.678), 0.02);
    assert_eq!(r, MovementVector::new(0.123, 45.7));
}

#[test]
fn tiny_velocity_snaps_to_zero() {
    let r = round_command(MovementVector::new(-0.019, 12.0), 0.02);
    assert_eq!(r.velocity, 0.0);
    assert!(r.velocity.is_sign_positive());
}

#[test]
fn rounding_clamps_out_of_range() {
    let r = round_command(MovementVector::new(1.7, -270.0), 0.02);
    assert_eq!(r, MovementVector::new(1.0, -180.0));
}
