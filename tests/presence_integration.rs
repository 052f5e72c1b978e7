//! Integration tests for the presence queue
//!
//! Join/heartbeat/leave through the engine, plus the eviction cascade.

use pretty_assertions::assert_eq;
use std::sync::Arc;

use soulmatch::core::{Engine, ManualClock};
use soulmatch::types::{
    EngineConfig, EngineEvent, EntryId, FocusWindowId, MatchId, MatchStatus, PressEventId, PressStatus,
    QueueStatus, ReasonCode,
};

fn engine_with(config: EngineConfig) -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    (Engine::with_seed(config, clock.clone(), 11), clock)
}

/// Windows and intro long enough that only eviction moves things
fn slow_config() -> EngineConfig {
    EngineConfig {
        focus_window_duration_ms: 60_000,
        max_press_duration_ms: 120_000,
        success_intro_ms: 100_000,
        ..EngineConfig::default()
    }
}

fn window_of(engine: &Engine, entry: EntryId) -> FocusWindowId {
    engine.client_state(entry).focus_window.unwrap().id
}

fn ready_press(engine: &Engine, clock: &ManualClock, entry: EntryId, target: EntryId) -> PressEventId {
    let window = window_of(engine, entry);
    let press = engine.press_start(entry, target, window).unwrap().press_event_id.unwrap();
    clock.advance(1500);
    let commit = engine.press_commit(entry, press, target, window).unwrap();
    assert!(commit.ok);
    press
}

fn mutual_match(engine: &Engine, clock: &ManualClock, a: EntryId, b: EntryId) -> MatchId {
    let (wa, wb) = (window_of(engine, a), window_of(engine, b));
    let pa = engine.press_start(a, b, wa).unwrap().press_event_id.unwrap();
    let pb = engine.press_start(b, a, wb).unwrap().press_event_id.unwrap();
    clock.advance(1500);
    engine.press_commit(a, pa, b, wa).unwrap();
    engine.press_commit(b, pb, a, wb).unwrap().match_id.unwrap()
}

#[test]
fn test_join_reuses_active_entry() {
    let (engine, clock) = engine_with(EngineConfig::default());
    let first = engine.join_queue("user-1", Some("Ana"), None).unwrap();
    clock.set(300);
    let second = engine.join_queue("user-1", Some("Ana"), None).unwrap();

    assert!(second.reused);
    assert_eq!(first.entry_id, second.entry_id);
    assert_eq!(second.joined_at, 0);
    assert_eq!(second.server_now, 300);
    assert_eq!(engine.queue_count(), 1);
}

#[test]
fn test_invalid_identity_is_fatal() {
    let (engine, _) = engine_with(EngineConfig::default());
    let err = engine.join_queue("not valid!", None, None).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::InvalidIdentity);
    assert!(err.is_fatal());
    assert_eq!(engine.queue_count(), 0);
}

#[test]
fn test_heartbeat_keeps_entry_alive() {
    let (engine, clock) = engine_with(EngineConfig::default());
    let entry = engine.join_queue("user-1", None, None).unwrap().entry_id;

    for _ in 0..6 {
        clock.advance(15_000);
        let ack = engine.heartbeat(entry).unwrap();
        assert_eq!(ack.status, Some(QueueStatus::Queued));
    }
    assert_eq!(engine.tick().evicted, 0);

    clock.advance(45_001);
    assert_eq!(engine.tick().evicted, 1);
    let err = engine.heartbeat(entry).unwrap_err();
    assert_eq!(err.reason(), ReasonCode::NotFound);
    assert!(!err.is_fatal());
}

#[test]
fn test_leave_is_idempotent() {
    let (engine, _) = engine_with(EngineConfig::default());
    let entry = engine.join_queue("user-1", None, None).unwrap().entry_id;

    let first = engine.leave_queue(entry);
    let second = engine.leave_queue(entry);
    let unknown = engine.leave_queue(EntryId::new());

    for ack in [first, second, unknown] {
        assert!(ack.ok);
        assert_eq!(ack.status, Some(QueueStatus::Inactive));
    }
    assert_eq!(engine.client_state(entry).queue_snapshot.status, QueueStatus::Inactive);
}

#[test]
fn test_eviction_cancels_ready_press() {
    let (engine, clock) = engine_with(slow_config());
    let e = engine.join_queue("evicted", None, None).unwrap().entry_id;
    let partner = engine.join_queue("partner", None, None).unwrap().entry_id;

    clock.set(100);
    let press = ready_press(&engine, &clock, e, partner);
    assert_eq!(engine.press_event(press).map(|p| p.status), Some(PressStatus::Ready));

    clock.set(40_000);
    engine.heartbeat(partner).unwrap();
    clock.set(45_001);
    let report = engine.tick();

    assert_eq!(report.evicted, 1);
    assert_eq!(engine.press_event(press).map(|p| p.status), Some(PressStatus::Cancelled));
    assert_eq!(engine.queue_entry(partner).map(|p| p.queue_status), Some(QueueStatus::Queued));
    assert_eq!(engine.queue_entry(e).map(|p| p.is_active), Some(false));
}

#[test]
fn test_eviction_cancels_pending_intro_match() {
    let (engine, clock) = engine_with(slow_config());
    let mut events = engine.subscribe();
    let e = engine.join_queue("evicted", None, None).unwrap().entry_id;
    let partner = engine.join_queue("partner", None, None).unwrap().entry_id;

    clock.set(100);
    let match_id = mutual_match(&engine, &clock, e, partner);
    assert_eq!(engine.match_record(match_id).map(|m| m.status), Some(MatchStatus::PendingIntro));

    clock.set(40_000);
    engine.heartbeat(partner).unwrap();
    clock.set(45_001);
    engine.tick();

    assert_eq!(engine.match_record(match_id).map(|m| m.status), Some(MatchStatus::Cancelled));
    let state = engine.client_state(partner);
    assert!(state.active_match.is_none());
    assert_eq!(state.queue_snapshot.status, QueueStatus::Queued);

    let mut saw_evicted = false;
    let mut saw_closed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::Evicted { entry_id, .. } => saw_evicted |= entry_id == e,
            EngineEvent::MatchClosed { status, .. } => saw_closed |= status == MatchStatus::Cancelled,
            _ => {}
        }
    }
    assert!(saw_evicted);
    assert!(saw_closed);
}

#[test]
fn test_leave_returns_partner_to_queue() {
    let (engine, clock) = engine_with(slow_config());
    let a = engine.join_queue("a", None, None).unwrap().entry_id;
    let b = engine.join_queue("b", None, None).unwrap().entry_id;
    clock.set(100);
    let match_id = mutual_match(&engine, &clock, a, b);

    engine.leave_queue(a);

    assert_eq!(engine.match_record(match_id).map(|m| m.status), Some(MatchStatus::Cancelled));
    assert_eq!(engine.client_state(b).queue_snapshot.status, QueueStatus::Queued);
    assert_eq!(engine.client_state(b).queue_snapshot.queue_count, 1);
}
