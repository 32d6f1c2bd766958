//! Tests for the per-instrument state machine

use bandscan::core::state::InstrumentState::{self, *};

#[test]
fn normal_cycle_is_allowed() {
    let mut state = InstrumentState::default();
    for next in [Scanning, Signaled, AwaitingSettlement, Idle] {
        state = state.transition(next).unwrap();
    }
    assert!(state.is_idle());
    assert_eq!(Scanning.transition(Idle), Ok(Idle));
}

#[test]
fn shortcuts_are_rejected() {
    for (from, to) in [
        (Idle, Signaled),
        (Idle, AwaitingSettlement),
        (Scanning, AwaitingSettlement),
        (Signaled, Idle),
        (AwaitingSettlement, Scanning),
        (Idle, Idle),
    ] {
        let err = from.transition(to).unwrap_err();
        assert_eq!((err.from, err.to), (from, to));
    }
}

#[test]
fn reset_always_returns_to_idle() {
    for state in [Idle, Scanning, Signaled, AwaitingSettlement] {
        assert_eq!(state.reset(), Idle);
    }
    assert_eq!(AwaitingSettlement.to_string(), "awaiting_settlement");
}
