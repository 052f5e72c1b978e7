//! Focus window scheduler
//!
//! Every eligible viewer independently cycles through the other eligible
//! entries, one target per window. Rotation is per viewer rather than a
//! global pairing.
//!
//! A viewer is due for rotation when it has no window, its window expired,
//! or its target dropped out (left, evicted, or matched with someone else).
//! Before a window is superseded the matcher gets a grace evaluation
//! against it, then unmatched presses from that window expire.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::matcher::ReciprocityMatcher;
use crate::core::press::expire_window_presses;
use crate::core::store::Tables;
use crate::types::{EngineConfig, EngineEvent, EntryId, FocusWindow};

#[derive(Debug, Clone)]
pub struct FocusScheduler {
    window_ms: u64,
}

impl FocusScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window_ms: config.focus_window_duration_ms,
        }
    }

    /// Rotate every viewer that is due; returns how many got a new window
    pub fn rotate_due<R: Rng + ?Sized>(
        &self,
        t: &mut Tables,
        matcher: &ReciprocityMatcher,
        rng: &mut R,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> usize {
        let pool: Vec<EntryId> = t
            .active_entries()
            .into_iter()
            .filter(|e| t.open_match_of(e.id).is_none())
            .map(|e| e.id)
            .collect();

        let mut rotated = 0;
        for &viewer in &pool {
            if t.open_match_of(viewer).is_some() {
                // Matched by an earlier grace evaluation in this pass
                continue;
            }
            let current = t.window_for(viewer).cloned();
            let due = match &current {
                None => true,
                Some(w) => w.is_expired_at(now) || !is_eligible(t, w.target_entry_id),
            };
            if !due {
                continue;
            }

            if let Some(outgoing) = current {
                matcher.evaluate_grace(t, viewer, &outgoing, now, events);
                if t.open_match_of(viewer).is_some() {
                    continue;
                }
                expire_window_presses(t, viewer, outgoing.id, now);
                t.clear_window(viewer);
            }

            let candidates: Vec<EntryId> = pool
                .iter()
                .copied()
                .filter(|c| *c != viewer && is_eligible(t, *c))
                .collect();
            if let Some(target) = pick_target(&candidates, t.previous_target(viewer), rng) {
                let window = FocusWindow::new(viewer, target, now, self.window_ms);
                tracing::debug!(viewer = %viewer, target = %target, window = %window.id, "Focus rotated");
                t.set_window(window);
                rotated += 1;
            }
        }
        rotated
    }
}

/// Uniform pick, skipping the previous target while there is an alternative
///
/// With exactly two candidates this alternates between them.
pub fn pick_target<R: Rng + ?Sized>(
    candidates: &[EntryId],
    previous: Option<EntryId>,
    rng: &mut R,
) -> Option<EntryId> {
    if candidates.len() >= 2 {
        let fresh: Vec<EntryId> = candidates.iter().copied().filter(|c| Some(*c) != previous).collect();
        if !fresh.is_empty() {
            return fresh.choose(rng).copied();
        }
    }
    candidates.choose(rng).copied()
}

fn is_eligible(t: &Tables, entry: EntryId) -> bool {
    t.active_entry(entry).is_some() && t.open_match_of(entry).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::types::QueueEntry;

    fn ids(n: usize) -> Vec<EntryId> {
        (0..n).map(|_| EntryId::new()).collect()
    }

    #[test]
    fn test_pick_never_repeats_with_alternatives() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = ids(4);
        let mut previous = None;
        for _ in 0..200 {
            let next = pick_target(&candidates, previous, &mut rng).unwrap();
            assert_ne!(Some(next), previous);
            previous = Some(next);
        }
    }

    #[test]
    fn test_two_candidates_alternate() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = ids(2);
        let first = pick_target(&candidates, None, &mut rng).unwrap();
        let second = pick_target(&candidates, Some(first), &mut rng).unwrap();
        let third = pick_target(&candidates, Some(second), &mut rng).unwrap();
        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_single_candidate_may_repeat() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = ids(1);
        assert_eq!(pick_target(&candidates, Some(candidates[0]), &mut rng), Some(candidates[0]));
        assert_eq!(pick_target(&[], None, &mut rng), None);
    }

    #[test]
    fn test_lone_viewer_gets_no_window() {
        let mut t = Tables::default();
        let entry = QueueEntry::new("solo", None, None, 0);
        let id = entry.id;
        t.insert_entry(entry);
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = Vec::new();

        let scheduler = FocusScheduler::new(&EngineConfig::default());
        assert_eq!(scheduler.rotate_due(&mut t, &ReciprocityMatcher::new(), &mut rng, 0, &mut events), 0);
        assert!(t.window_for(id).is_none());
    }

    #[test]
    fn test_rotation_waits_for_expiry() {
        let mut t = Tables::default();
        let a = QueueEntry::new("a", None, None, 0);
        let b = QueueEntry::new("b", None, None, 0);
        let (a_id, b_id) = (a.id, b.id);
        t.insert_entry(a);
        t.insert_entry(b);
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = Vec::new();
        let scheduler = FocusScheduler::new(&EngineConfig::default());
        let matcher = ReciprocityMatcher::new();

        assert_eq!(scheduler.rotate_due(&mut t, &matcher, &mut rng, 0, &mut events), 2);
        let first = t.window_for(a_id).cloned().unwrap();
        assert_eq!(first.target_entry_id, b_id);
        assert_eq!(first.ends_at, 3000);

        assert_eq!(scheduler.rotate_due(&mut t, &matcher, &mut rng, 2999, &mut events), 0);
        assert_eq!(scheduler.rotate_due(&mut t, &matcher, &mut rng, 3000, &mut events), 2);
        let second = t.window_for(a_id).cloned().unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.starts_at, 3000);
    }
}
