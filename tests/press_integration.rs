//! Integration tests for press/hold tracking
//!
//! Hold time is always measured on the engine clock, so these tests drive a
//! ManualClock and never sleep.

use pretty_assertions::assert_eq;
use std::sync::Arc;

use soulmatch::core::{Engine, ManualClock};
use soulmatch::types::{
    EngineConfig, EntryId, FocusWindowId, PressStatus, QueueStatus, ReasonCode,
};

struct Duo {
    engine: Engine,
    clock: Arc<ManualClock>,
    a: EntryId,
    b: EntryId,
    wa: FocusWindowId,
}

fn duo(config: EngineConfig) -> Duo {
    let clock = Arc::new(ManualClock::new(0));
    let engine = Engine::with_seed(config, clock.clone(), 5);
    let a = engine.join_queue("a", None, None).unwrap().entry_id;
    let b = engine.join_queue("b", None, None).unwrap().entry_id;
    let wa = engine.client_state(a).focus_window.unwrap().id;
    Duo { engine, clock, a, b, wa }
}

#[test]
fn test_press_start_twice_returns_same_press() {
    let Duo { engine, clock, a, b, wa } = duo(EngineConfig::default());
    clock.set(100);
    let first = engine.press_start(a, b, wa).unwrap();
    clock.set(350);
    let second = engine.press_start(a, b, wa).unwrap();

    assert_eq!(first.press_event_id, second.press_event_id);
    assert!(second.reused);
    assert!(!second.is_ready);
    assert_eq!(engine.record_counts().1, 1);
    assert_eq!(engine.client_state(a).queue_snapshot.status, QueueStatus::Matching);
}

#[test]
fn test_never_ready_below_min_hold() {
    let Duo { engine, clock, a, b, wa } = duo(EngineConfig::default());
    clock.set(100);
    let press = engine.press_start(a, b, wa).unwrap().press_event_id.unwrap();

    // Client retries eagerly; none of these may promote the press
    for now in [200, 800, 1400, 1599] {
        clock.set(now);
        let commit = engine.press_commit(a, press, b, wa).unwrap();
        assert!(!commit.ok);
        assert_eq!(commit.reason, Some(ReasonCode::MinHold));
        assert_eq!(commit.duration_ms, Some(now - 100));
        assert_eq!(engine.press_event(press).map(|p| p.status), Some(PressStatus::Pending));
    }

    clock.set(1600);
    let commit = engine.press_commit(a, press, b, wa).unwrap();
    assert!(commit.ok);
    assert_eq!(commit.duration_ms, Some(1500));
    let stored = engine.press_event(press).unwrap();
    assert_eq!(stored.status, PressStatus::Ready);
    assert_eq!(stored.ready_at, Some(1600));
}

#[test]
fn test_commit_with_wrong_window_is_rejected() {
    let Duo { engine, clock, a, b, wa } = duo(EngineConfig::default());
    let press = engine.press_start(a, b, wa).unwrap().press_event_id.unwrap();
    clock.set(1600);

    let err = engine.press_commit(a, press, b, FocusWindowId::new()).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::FocusWindowMismatch);
    let err = engine.press_commit(b, press, a, wa).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::PressNotFound);
}

#[test]
fn test_press_start_on_stale_window_is_rejected() {
    let Duo { engine, clock, a, b, wa } = duo(EngineConfig::default());
    clock.set(3000);

    let err = engine.press_start(a, b, wa).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::FocusWindowMismatch);
    assert!(!err.is_fatal());

    // The rotation that ran with the command handed out a fresh window
    let fresh = engine.client_state(a).focus_window.unwrap();
    assert_ne!(fresh.id, wa);
    assert_eq!(fresh.starts_at, 3000);
    assert!(engine.press_start(a, b, fresh.id).unwrap().ok);
}

#[test]
fn test_cancel_pending_then_repress() {
    let Duo { engine, clock, a, b, wa } = duo(EngineConfig::default());
    let first = engine.press_start(a, b, wa).unwrap().press_event_id.unwrap();
    clock.set(400);
    let cancel = engine.press_cancel(a, first).unwrap();
    assert!(cancel.ok);
    assert!(!cancel.preserved);
    assert_eq!(engine.client_state(a).queue_snapshot.status, QueueStatus::Queued);

    // Cancelling twice is harmless
    assert!(engine.press_cancel(a, first).unwrap().ok);

    clock.set(500);
    let second = engine.press_start(a, b, wa).unwrap();
    assert!(!second.reused);
    assert_ne!(second.press_event_id, Some(first));
}

#[test]
fn test_cancel_after_ready_is_preserved() {
    let Duo { engine, clock, a, b, wa } = duo(EngineConfig::default());
    let press = engine.press_start(a, b, wa).unwrap().press_event_id.unwrap();
    clock.set(1500);
    engine.press_commit(a, press, b, wa).unwrap();

    let cancel = engine.press_cancel(a, press).unwrap();
    assert!(cancel.ok);
    assert!(cancel.preserved);
    assert_eq!(engine.press_event(press).map(|p| p.status), Some(PressStatus::Ready));

    let again = engine.press_start(a, b, wa).unwrap();
    assert!(again.reused);
    assert!(again.is_ready);
}

#[test]
fn test_pending_press_expires_after_max_duration() {
    let config = EngineConfig {
        focus_window_duration_ms: 10_000,
        max_press_duration_ms: 6000,
        ..EngineConfig::default()
    };
    let Duo { engine, clock, a, b, wa } = duo(config);
    let press = engine.press_start(a, b, wa).unwrap().press_event_id.unwrap();

    clock.set(6000);
    assert_eq!(engine.tick().expired, 0);
    clock.set(6001);
    assert_eq!(engine.tick().expired, 1);
    assert_eq!(engine.press_event(press).map(|p| p.status), Some(PressStatus::Expired));

    let err = engine.press_commit(a, press, b, wa).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::FocusWindowMismatch);
}

#[test]
fn test_press_against_unknown_entry() {
    let Duo { engine, b, wa, .. } = duo(EngineConfig::default());
    let err = engine.press_start(EntryId::new(), b, wa).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::NotFound);
}
