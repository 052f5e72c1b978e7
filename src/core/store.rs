//! Engine store: the queue roster plus press and match tables
//!
//! `Tables` owns the records and the secondary indexes that keep the
//! invariants cheap to check:
//! - at most one active entry per owner identity
//! - at most one live press per entry
//! - at most one open match per entry and per pair
//!
//! Status changes go through `transition_press` / `transition_match`, which
//! refuse backwards moves and keep the indexes in step.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::types::{
    EntryId, FocusWindow, FocusWindowId, Match, MatchId, MatchStatus, PairKey,
    PressEvent, PressEventId, PressStatus, QueueEntry, QueueStatus,
};

/// Transactional access to the tables
///
/// A `write` closure is one atomic read-decide-write step. The reciprocity
/// matcher relies on this to flip both sides of a pair together.
pub trait Store: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R;
    fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let guard = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut guard = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[derive(Debug, Default)]
pub struct Tables {
    entries: HashMap<EntryId, QueueEntry>,
    identities: HashMap<String, EntryId>,
    windows: HashMap<EntryId, FocusWindow>,
    previous_targets: HashMap<EntryId, EntryId>,
    presses: HashMap<PressEventId, PressEvent>,
    press_keys: HashMap<(EntryId, FocusWindowId), PressEventId>,
    live_presses: HashMap<EntryId, PressEventId>,
    matches: HashMap<MatchId, Match>,
    open_matches: HashMap<EntryId, MatchId>,
    open_pairs: HashMap<PairKey, MatchId>,
    press_matches: HashMap<PressEventId, MatchId>,
}

impl Tables {
    // =========================================================================
    // Entries
    // =========================================================================

    pub fn insert_entry(&mut self, entry: QueueEntry) {
        if entry.is_active {
            self.identities.insert(entry.owner_identity.clone(), entry.id);
        }
        self.entries.insert(entry.id, entry);
    }

    /// Any entry, active or not
    pub fn entry(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.get(&id)
    }

    pub fn active_entry(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.get(&id).filter(|e| e.is_active)
    }

    pub fn active_entry_mut(&mut self, id: EntryId) -> Option<&mut QueueEntry> {
        self.entries.get_mut(&id).filter(|e| e.is_active)
    }

    pub fn active_entry_for_identity(&self, identity: &str) -> Option<&QueueEntry> {
        self.identities.get(identity).and_then(|id| self.active_entry(*id))
    }

    /// Active entries in join order
    pub fn active_entries(&self) -> Vec<&QueueEntry> {
        let mut active: Vec<&QueueEntry> = self.entries.values().filter(|e| e.is_active).collect();
        active.sort_by_key(|e| (e.joined_at, e.id));
        active
    }

    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_active).count()
    }

    /// Mark inactive and drop the entry out of rotation; false if already inactive
    pub fn deactivate_entry(&mut self, id: EntryId, now: u64) -> bool {
        let Some(entry) = self.entries.get_mut(&id).filter(|e| e.is_active) else {
            return false;
        };
        entry.is_active = false;
        entry.left_at = Some(now);
        entry.current_target_id = None;
        entry.queue_status = QueueStatus::Inactive;
        if self.identities.get(&entry.owner_identity) == Some(&id) {
            self.identities.remove(&entry.owner_identity);
        }
        self.windows.remove(&id);
        self.previous_targets.remove(&id);
        true
    }

    /// Recompute an entry's queue status from its press and match state
    pub fn refresh_entry_status(&mut self, id: EntryId) {
        let status = if self.active_entry(id).is_none() {
            QueueStatus::Inactive
        } else if self.open_matches.contains_key(&id) {
            QueueStatus::Matched
        } else if self.live_presses.contains_key(&id) {
            QueueStatus::Matching
        } else {
            QueueStatus::Queued
        };
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.queue_status = status;
        }
    }

    // =========================================================================
    // Focus windows
    // =========================================================================

    /// Current window, expired or not
    pub fn window_for(&self, viewer: EntryId) -> Option<&FocusWindow> {
        self.windows.get(&viewer)
    }

    /// Install a viewer's next window, remembering its target for the no-repeat rule
    pub fn set_window(&mut self, window: FocusWindow) {
        let viewer = window.viewer_entry_id;
        let target = window.target_entry_id;
        if let Some(entry) = self.entries.get_mut(&viewer) {
            entry.current_target_id = Some(target);
        }
        self.previous_targets.insert(viewer, target);
        self.windows.insert(viewer, window);
    }

    /// Remove the viewer's window without forgetting the previous target
    pub fn clear_window(&mut self, viewer: EntryId) -> Option<FocusWindow> {
        if let Some(entry) = self.entries.get_mut(&viewer) {
            entry.current_target_id = None;
        }
        self.windows.remove(&viewer)
    }

    pub fn previous_target(&self, viewer: EntryId) -> Option<EntryId> {
        self.previous_targets.get(&viewer).copied()
    }

    // =========================================================================
    // Presses
    // =========================================================================

    pub fn insert_press(&mut self, press: PressEvent) {
        let pressor = press.pressor_entry_id;
        self.press_keys.insert((pressor, press.focus_window_id), press.id);
        if press.status.is_live() {
            self.live_presses.insert(pressor, press.id);
        }
        self.presses.insert(press.id, press);
        self.refresh_entry_status(pressor);
    }

    pub fn press(&self, id: PressEventId) -> Option<&PressEvent> {
        self.presses.get(&id)
    }

    /// Latest press an entry started under a given window
    pub fn press_for_window(&self, entry: EntryId, window: FocusWindowId) -> Option<&PressEvent> {
        self.press_keys.get(&(entry, window)).and_then(|id| self.presses.get(id))
    }

    /// The entry's pending or ready press
    pub fn live_press_of(&self, entry: EntryId) -> Option<&PressEvent> {
        self.live_presses.get(&entry).and_then(|id| self.presses.get(id))
    }

    pub fn live_presses(&self) -> Vec<&PressEvent> {
        self.live_presses.values().filter_map(|id| self.presses.get(id)).collect()
    }

    /// Apply a forward status change; false if the move is not allowed
    pub fn transition_press(&mut self, id: PressEventId, next: PressStatus, now: u64) -> bool {
        let Some(press) = self.presses.get_mut(&id) else {
            return false;
        };
        if !press.status.can_transition_to(next) {
            return false;
        }
        press.status = next;
        if next == PressStatus::Ready {
            press.ready_at = Some(now);
        }
        if next.is_terminal() {
            press.ended_at = Some(now);
            press.duration_ms = Some(now.saturating_sub(press.started_at));
            let pressor = press.pressor_entry_id;
            if self.live_presses.get(&pressor) == Some(&id) {
                self.live_presses.remove(&pressor);
            }
            self.refresh_entry_status(pressor);
        }
        true
    }

    // =========================================================================
    // Matches
    // =========================================================================

    pub fn insert_match(&mut self, record: Match) {
        if !record.status.is_terminal() {
            self.open_pairs.insert(record.pair_key(), record.id);
            for participant in record.participants() {
                self.open_matches.insert(participant, record.id);
            }
        }
        self.press_matches.insert(record.press_a, record.id);
        self.press_matches.insert(record.press_b, record.id);
        let participants = record.participants();
        self.matches.insert(record.id, record);
        for participant in participants {
            self.refresh_entry_status(participant);
        }
    }

    pub fn match_record(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn match_record_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&id)
    }

    /// The match a press formed, open or closed
    pub fn match_for_press(&self, press: PressEventId) -> Option<&Match> {
        self.press_matches.get(&press).and_then(|id| self.matches.get(id))
    }

    /// The entry's pending_intro or active match
    pub fn open_match_of(&self, entry: EntryId) -> Option<&Match> {
        self.open_matches.get(&entry).and_then(|id| self.matches.get(id))
    }

    pub fn open_match_for_pair(&self, pair: PairKey) -> Option<&Match> {
        self.open_pairs.get(&pair).and_then(|id| self.matches.get(id))
    }

    pub fn open_matches(&self) -> Vec<&Match> {
        let mut open: Vec<&Match> = self.open_pairs.values().filter_map(|id| self.matches.get(id)).collect();
        open.sort_by_key(|m| (m.created_at, m.id));
        open
    }

    /// Apply a forward status change; false if the move is not allowed
    pub fn transition_match(&mut self, id: MatchId, next: MatchStatus, now: u64) -> bool {
        let Some(record) = self.matches.get_mut(&id) else {
            return false;
        };
        if !record.status.can_transition_to(next) {
            return false;
        }
        record.status = next;
        if next.is_terminal() {
            record.ended_at = Some(now);
            let pair = record.pair_key();
            let participants = record.participants();
            if self.open_pairs.get(&pair) == Some(&id) {
                self.open_pairs.remove(&pair);
            }
            for participant in participants {
                if self.open_matches.get(&participant) == Some(&id) {
                    self.open_matches.remove(&participant);
                }
                self.refresh_entry_status(participant);
            }
        }
        true
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Drop inactive entries and terminal records that ended before `cutoff`
    pub fn prune_before(&mut self, cutoff: u64) -> usize {
        let before = self.entries.len() + self.presses.len() + self.matches.len();

        self.entries.retain(|_, e| e.is_active || e.left_at.is_some_and(|t| t >= cutoff));
        self.presses.retain(|_, p| p.status.is_live() || p.ended_at.is_some_and(|t| t >= cutoff));
        self.matches.retain(|_, m| !m.status.is_terminal() || m.ended_at.is_some_and(|t| t >= cutoff));

        let presses = &self.presses;
        self.press_keys.retain(|_, id| presses.contains_key(id));
        let matches = &self.matches;
        self.press_matches.retain(|_, id| matches.contains_key(id));
        let entries = &self.entries;
        self.previous_targets.retain(|viewer, _| entries.contains_key(viewer));

        before - (self.entries.len() + self.presses.len() + self.matches.len())
    }

    pub fn record_counts(&self) -> (usize, usize, usize) {
        (self.entries.len(), self.presses.len(), self.matches.len())
    }
}
