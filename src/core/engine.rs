//! Matchmaking engine
//!
//! Facade over the store and the components. Every mutating command is one
//! write transaction: a maintenance pass, the command itself, then a
//! rotation pass so queue changes get windows right away. Events collected
//! during the transaction are broadcast after the lock is released.
//!
//! `client_state` is a pure read and never runs maintenance.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::core::clock::{Clock, SystemClock};
use crate::core::lifecycle::MatchLifecycle;
use crate::core::matcher::ReciprocityMatcher;
use crate::core::presence::PresenceQueue;
use crate::core::press::PressTracker;
use crate::core::projector::ClientStateProjector;
use crate::core::scheduler::FocusScheduler;
use crate::core::store::{MemoryStore, Store, Tables};
use crate::types::{
    AckResult, ClientState, EngineConfig, EngineEvent, EngineResult, EntryId, FocusWindowId,
    JoinResult, Match, MatchActionResult, MatchId, PressCancelResult, PressCommitResult,
    PressEvent, PressEventId, PressStartResult, QueueEntry,
};

const EVENT_CAPACITY: usize = 256;

/// What one maintenance pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub evicted: usize,
    pub activated: usize,
    pub ended: usize,
    pub expired: usize,
    pub rotated: usize,
    pub pruned: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

pub struct Engine<S: Store = MemoryStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    rng: Mutex<StdRng>,
    events: broadcast::Sender<EngineEvent>,
    presence: PresenceQueue,
    scheduler: FocusScheduler,
    tracker: PressTracker,
    matcher: ReciprocityMatcher,
    lifecycle: MatchLifecycle,
    projector: ClientStateProjector,
}

impl Engine<MemoryStore> {
    /// In-memory engine on the wall clock
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_store(MemoryStore::new(), config, clock, StdRng::from_entropy())
    }

    /// Deterministic target selection for tests and simulation
    pub fn with_seed(config: EngineConfig, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::with_store(MemoryStore::new(), config, clock, StdRng::seed_from_u64(seed))
    }
}

impl<S: Store> Engine<S> {
    pub fn with_store(store: S, config: EngineConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            presence: PresenceQueue::new(&config),
            scheduler: FocusScheduler::new(&config),
            tracker: PressTracker::new(&config),
            matcher: ReciprocityMatcher::new(),
            lifecycle: MatchLifecycle::new(&config),
            projector: ClientStateProjector::new(&config),
            store,
            clock,
            config,
            rng: Mutex::new(rng),
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn queue_count(&self) -> usize {
        self.store.read(|t| t.active_count())
    }

    /// Records held as (entries, presses, matches), pruned ones excluded
    pub fn record_counts(&self) -> (usize, usize, usize) {
        self.store.read(|t| t.record_counts())
    }

    pub fn queue_entry(&self, id: EntryId) -> Option<QueueEntry> {
        self.store.read(|t| t.entry(id).cloned())
    }

    pub fn press_event(&self, id: PressEventId) -> Option<PressEvent> {
        self.store.read(|t| t.press(id).cloned())
    }

    pub fn match_record(&self, id: MatchId) -> Option<Match> {
        self.store.read(|t| t.match_record(id).cloned())
    }

    // =========================================================================
    // Presence
    // =========================================================================

    pub fn join_queue(
        &self,
        identity: &str,
        display_name: Option<&str>,
        avatar_ref: Option<&str>,
    ) -> EngineResult<JoinResult> {
        self.command(|engine, t, now, events| {
            engine.presence.join(t, identity, display_name, avatar_ref, now, events)
        })
    }

    pub fn heartbeat(&self, entry: EntryId) -> EngineResult<AckResult> {
        self.command(|engine, t, now, _| engine.presence.heartbeat(t, entry, now))
    }

    pub fn leave_queue(&self, entry: EntryId) -> AckResult {
        self.command(|engine, t, now, events| engine.presence.leave(t, entry, now, events))
    }

    // =========================================================================
    // Press / hold
    // =========================================================================

    pub fn press_start(
        &self,
        entry: EntryId,
        target: EntryId,
        window: FocusWindowId,
    ) -> EngineResult<PressStartResult> {
        self.command(|engine, t, now, _| engine.tracker.start(t, entry, target, window, now))
    }

    pub fn press_commit(
        &self,
        entry: EntryId,
        press: PressEventId,
        target: EntryId,
        window: FocusWindowId,
    ) -> EngineResult<PressCommitResult> {
        self.command(|engine, t, now, events| {
            engine.tracker.commit(t, &engine.matcher, entry, press, target, window, now, events)
        })
    }

    pub fn press_cancel(&self, entry: EntryId, press: PressEventId) -> EngineResult<PressCancelResult> {
        self.command(|engine, t, now, _| engine.tracker.cancel(t, entry, press, now))
    }

    // =========================================================================
    // Matches
    // =========================================================================

    pub fn acknowledge_match(&self, entry: EntryId, match_id: MatchId) -> EngineResult<MatchActionResult> {
        self.command(|engine, t, now, events| engine.lifecycle.acknowledge(t, entry, match_id, now, events))
    }

    pub fn close_match(&self, entry: EntryId, match_id: MatchId) -> EngineResult<MatchActionResult> {
        self.command(|engine, t, now, events| engine.lifecycle.close(t, entry, match_id, now, events))
    }

    // =========================================================================
    // Projection / maintenance
    // =========================================================================

    pub fn client_state(&self, entry: EntryId) -> ClientState {
        let now = self.clock.now_ms();
        self.store.read(|t| self.projector.project(t, entry, now))
    }

    /// Run one maintenance pass at the current engine time
    pub fn tick(&self) -> TickReport {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        let report = self.store.write(|t| self.maintain(t, now, &mut events));
        if !report.is_idle() {
            tracing::debug!(?report, now, "Maintenance pass");
        }
        self.publish(events);
        report
    }

    fn command<R>(&self, op: impl FnOnce(&Self, &mut Tables, u64, &mut Vec<EngineEvent>) -> R) -> R {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        let result = self.store.write(|t| {
            self.maintain(t, now, &mut events);
            let result = op(self, t, now, &mut events);
            self.rotate(t, now, &mut events);
            result
        });
        self.publish(events);
        result
    }

    fn maintain(&self, t: &mut Tables, now: u64, events: &mut Vec<EngineEvent>) -> TickReport {
        let evicted = self.presence.evict_stale(t, now, events).len();
        let (activated, ended) = self.lifecycle.advance(t, now, events);
        let mut expired = self.tracker.expire_overdue(t, now);
        let rotated = self.rotate(t, now, events);
        expired += self.tracker.expire_outside_window(t, now);
        let pruned = t.prune_before(now.saturating_sub(self.config.retention_ms));
        TickReport { evicted, activated, ended, expired, rotated, pruned }
    }

    fn rotate(&self, t: &mut Tables, now: u64, events: &mut Vec<EngineEvent>) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.scheduler.rotate_due(t, &self.matcher, &mut *rng, now, events)
    }

    fn publish(&self, events: Vec<EngineEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}
