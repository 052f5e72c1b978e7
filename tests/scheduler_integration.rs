//! Integration tests for focus window rotation

use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use soulmatch::core::{Engine, ManualClock};
use soulmatch::types::{EngineConfig, EntryId};

fn engine() -> (Engine, Arc<ManualClock>) {
    let config = EngineConfig {
        stale_after_ms: 10_000_000,
        ..EngineConfig::default()
    };
    let clock = Arc::new(ManualClock::new(0));
    (Engine::with_seed(config, clock.clone(), 21), clock)
}

fn target_of(engine: &Engine, viewer: EntryId) -> Option<EntryId> {
    engine.client_state(viewer).focus_target.map(|t| t.entry_id)
}

#[test]
fn test_rotation_never_repeats_and_covers_everyone() {
    let (engine, clock) = engine();
    let ids: Vec<EntryId> = (0..4)
        .map(|i| engine.join_queue(&format!("user-{}", i), None, None).unwrap().entry_id)
        .collect();
    let viewer = ids[0];

    let mut seen = HashSet::new();
    let mut previous = target_of(&engine, viewer);
    for step in 1..=30 {
        clock.set(step * 3000);
        engine.tick();
        let current = target_of(&engine, viewer);
        assert!(current.is_some());
        assert_ne!(current, previous);
        assert_ne!(current, Some(viewer));
        seen.extend(current);
        previous = current;
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_windows_follow_the_configured_duration() {
    let (engine, clock) = engine();
    let a = engine.join_queue("a", None, None).unwrap().entry_id;
    engine.join_queue("b", None, None).unwrap();

    clock.set(1234);
    let window = engine.client_state(a).focus_window.unwrap();
    assert_eq!((window.starts_at, window.ends_at, window.duration_ms), (0, 3000, 3000));

    clock.set(4500);
    engine.tick();
    let window = engine.client_state(a).focus_window.unwrap();
    assert_eq!((window.starts_at, window.ends_at), (4500, 7500));
}

#[test]
fn test_two_entries_alternate_with_each_other() {
    let (engine, clock) = engine();
    let a = engine.join_queue("a", None, None).unwrap().entry_id;
    let b = engine.join_queue("b", None, None).unwrap().entry_id;

    for step in 0..5 {
        clock.set(step * 3000);
        engine.tick();
        assert_eq!(target_of(&engine, a), Some(b));
        assert_eq!(target_of(&engine, b), Some(a));
    }
}

#[test]
fn test_departed_target_is_replaced_immediately() {
    let (engine, clock) = engine();
    let ids: Vec<EntryId> = ["a", "b", "c"]
        .iter()
        .map(|name| engine.join_queue(name, None, None).unwrap().entry_id)
        .collect();
    let targets: HashMap<EntryId, EntryId> = ids
        .iter()
        .filter_map(|&viewer| target_of(&engine, viewer).map(|t| (viewer, t)))
        .collect();
    assert_eq!(targets.len(), 3);

    let viewer = ids[2];
    let leaving = targets[&viewer];
    clock.set(1000);
    engine.leave_queue(leaving);

    let replacement = target_of(&engine, viewer);
    assert!(replacement.is_some());
    assert_ne!(replacement, Some(leaving));
    let window = engine.client_state(viewer).focus_window.unwrap();
    assert_eq!(window.starts_at, 1000);
}

#[test]
fn test_estimated_wait_scales_with_candidates() {
    let (engine, _) = engine();
    let a = engine.join_queue("a", None, None).unwrap().entry_id;
    assert_eq!(engine.client_state(a).queue_snapshot.estimated_wait_ms, None);

    engine.join_queue("b", None, None).unwrap();
    engine.join_queue("c", None, None).unwrap();
    let snapshot = engine.client_state(a).queue_snapshot;
    assert_eq!(snapshot.online_candidates.len(), 2);
    assert_eq!(snapshot.estimated_wait_ms, Some(6000));
}
