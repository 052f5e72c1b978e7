//! Press/hold tracker
//!
//! Hold duration is always measured from the press's own `started_at` on
//! the engine clock. A client's claim that it held long enough is only a
//! hint to re-check.
//!
//! Transitions:
//! - start: new PENDING press, reused per (entry, window)
//! - commit: PENDING → READY once elapsed ≥ min hold inside a valid window
//! - cancel: PENDING → CANCELLED; READY/MATCHED are preserved

use crate::core::matcher::ReciprocityMatcher;
use crate::core::store::Tables;
use crate::types::{
    clamp_progress, EngineConfig, EngineError, EngineEvent, EngineResult, EntryId,
    FocusWindowId, PressCancelResult, PressCommitResult, PressEvent, PressEventId,
    PressStartResult, PressStatus, ReasonCode,
};

#[derive(Debug, Clone)]
pub struct PressTracker {
    min_hold_ms: u64,
    max_press_duration_ms: u64,
}

impl PressTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_hold_ms: config.min_hold_ms,
            max_press_duration_ms: config.max_press_duration_ms,
        }
    }

    pub fn min_hold_ms(&self) -> u64 {
        self.min_hold_ms
    }

    /// Start (or re-acknowledge) a press on the caller's current focus target
    pub fn start(
        &self,
        t: &mut Tables,
        entry: EntryId,
        target: EntryId,
        window_id: FocusWindowId,
        now: u64,
    ) -> EngineResult<PressStartResult> {
        if t.active_entry(entry).is_none() {
            return Err(EngineError::NotFound(entry));
        }
        if t.open_match_of(entry).is_some() {
            return Err(EngineError::AlreadyMatched(entry));
        }
        let window = t
            .window_for(entry)
            .filter(|w| w.id == window_id && w.target_entry_id == target && w.is_valid_at(now))
            .filter(|w| t.active_entry(w.target_entry_id).is_some())
            .cloned()
            .ok_or(EngineError::FocusWindowMismatch(entry))?;

        if let Some(existing) = t.press_for_window(entry, window.id) {
            if matches!(existing.status, PressStatus::Pending | PressStatus::Ready | PressStatus::Matched) {
                tracing::debug!(entry = %entry, press = %existing.id, "Press start reused");
                return Ok(PressStartResult {
                    ok: true,
                    press_event_id: Some(existing.id),
                    reason: None,
                    reused: true,
                    is_ready: existing.status != PressStatus::Pending,
                    server_now: now,
                });
            }
        }

        // A live press under an older window cannot survive a new one
        if let Some(stale) = t.live_press_of(entry).map(|p| p.id) {
            t.transition_press(stale, PressStatus::Expired, now);
        }

        let press = PressEvent::start(&window, now);
        let press_id = press.id;
        t.insert_press(press);
        tracing::debug!(entry = %entry, target = %target, press = %press_id, "Press started");

        Ok(PressStartResult {
            ok: true,
            press_event_id: Some(press_id),
            reason: None,
            reused: false,
            is_ready: false,
            server_now: now,
        })
    }

    /// Promote a held press to READY and try to complete a reciprocal match
    #[allow(clippy::too_many_arguments)]
    pub fn commit(
        &self,
        t: &mut Tables,
        matcher: &ReciprocityMatcher,
        entry: EntryId,
        press_id: PressEventId,
        target: EntryId,
        window_id: FocusWindowId,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<PressCommitResult> {
        if t.active_entry(entry).is_none() {
            return Err(EngineError::NotFound(entry));
        }
        let press = t
            .press(press_id)
            .filter(|p| p.pressor_entry_id == entry)
            .cloned()
            .ok_or(EngineError::PressNotFound(press_id))?;
        if press.target_entry_id != target || press.focus_window_id != window_id {
            return Err(EngineError::FocusWindowMismatch(entry));
        }
        let elapsed = press.elapsed_ms(now);

        match press.status {
            PressStatus::Matched => {
                // Closed matches still answer the retry
                let match_id = t.match_for_press(press_id).map(|m| m.id);
                let duration = press.duration_ms.unwrap_or(elapsed);
                return Ok(PressCommitResult {
                    ok: true,
                    matched: true,
                    match_id,
                    reason: None,
                    duration_ms: Some(duration),
                    server_now: now,
                });
            }
            PressStatus::Ready => {
                // Retried commit: re-check the partner side
                let match_id = matcher.evaluate(t, press_id, now, now, events);
                return Ok(PressCommitResult::ready(match_id, elapsed, now));
            }
            PressStatus::Expired => return Err(EngineError::FocusWindowMismatch(entry)),
            PressStatus::Cancelled => return Err(EngineError::PressNotActive(press_id)),
            PressStatus::Pending => {}
        }

        if t.open_match_of(entry).is_some() {
            return Err(EngineError::AlreadyMatched(entry));
        }
        let still_current = t
            .window_for(entry)
            .is_some_and(|w| w.id == window_id && w.target_entry_id == target);
        if !press.window_valid_at(now) || !still_current {
            t.transition_press(press_id, PressStatus::Expired, now);
            return Err(EngineError::FocusWindowMismatch(entry));
        }
        if elapsed < self.min_hold_ms {
            return Ok(PressCommitResult::min_hold(elapsed, now));
        }

        t.transition_press(press_id, PressStatus::Ready, now);
        tracing::info!(entry = %entry, target = %target, press = %press_id, elapsed_ms = elapsed, "Press ready");

        let match_id = matcher.evaluate(t, press_id, now, now, events);
        Ok(PressCommitResult::ready(match_id, elapsed, now))
    }

    /// Release before commit
    pub fn cancel(
        &self,
        t: &mut Tables,
        entry: EntryId,
        press_id: PressEventId,
        now: u64,
    ) -> EngineResult<PressCancelResult> {
        if t.active_entry(entry).is_none() {
            return Err(EngineError::NotFound(entry));
        }
        let status = t
            .press(press_id)
            .filter(|p| p.pressor_entry_id == entry)
            .map(|p| p.status)
            .ok_or(EngineError::PressNotFound(press_id))?;

        let (preserved, reason) = match status {
            PressStatus::Pending => {
                t.transition_press(press_id, PressStatus::Cancelled, now);
                tracing::debug!(entry = %entry, press = %press_id, "Press cancelled");
                (false, None)
            }
            // Lost the race to a commit or a match; keep the hold
            PressStatus::Ready | PressStatus::Matched => (true, None),
            PressStatus::Cancelled => (false, None),
            PressStatus::Expired => (false, Some(ReasonCode::PressNotActive)),
        };

        Ok(PressCancelResult {
            ok: true,
            preserved,
            reason,
            server_now: now,
        })
    }

    /// Expire pending presses past their window or held too long
    ///
    /// Ready presses are left alone here: the scheduler gives them a grace
    /// evaluation before their window is superseded.
    pub fn expire_overdue(&self, t: &mut Tables, now: u64) -> usize {
        let overdue: Vec<PressEventId> = t
            .live_presses()
            .into_iter()
            .filter(|p| p.status == PressStatus::Pending)
            .filter(|p| !p.window_valid_at(now) || p.elapsed_ms(now) > self.max_press_duration_ms)
            .map(|p| p.id)
            .collect();
        expire_all(t, overdue, now)
    }

    /// Expire any live press whose window has closed, ready ones included
    pub fn expire_outside_window(&self, t: &mut Tables, now: u64) -> usize {
        let stranded: Vec<PressEventId> = t
            .live_presses()
            .into_iter()
            .filter(|p| !p.window_valid_at(now))
            .map(|p| p.id)
            .collect();
        expire_all(t, stranded, now)
    }

    /// Hold progress for display: (elapsed ms, ratio against min hold)
    pub fn progress(&self, press: &PressEvent, now: u64) -> (u64, f64) {
        let elapsed = press.elapsed_ms(now);
        let ratio = if press.status != PressStatus::Pending {
            1.0
        } else {
            clamp_progress(elapsed as f64 / self.min_hold_ms as f64)
        };
        (elapsed, ratio)
    }
}

fn expire_all(t: &mut Tables, ids: Vec<PressEventId>, now: u64) -> usize {
    let mut expired = 0;
    for id in ids {
        if t.transition_press(id, PressStatus::Expired, now) {
            tracing::debug!(press = %id, "Press expired");
            expired += 1;
        }
    }
    expired
}

/// Expire a viewer's unmatched presses from a superseded window
pub fn expire_window_presses(t: &mut Tables, viewer: EntryId, window: FocusWindowId, now: u64) {
    if let Some(id) = t.press_for_window(viewer, window).filter(|p| p.status.is_live()).map(|p| p.id) {
        t.transition_press(id, PressStatus::Expired, now);
    }
}

/// Cancel the entry's pending or ready press (departure cascade)
pub fn cancel_live_press(t: &mut Tables, entry: EntryId, now: u64) -> bool {
    let Some(id) = t.live_press_of(entry).map(|p| p.id) else {
        return false;
    };
    t.transition_press(id, PressStatus::Cancelled, now)
}
