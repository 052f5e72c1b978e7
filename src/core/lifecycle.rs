//! Match/session lifecycle
//!
//! State transitions:
//! - PENDING_INTRO → ACTIVE: both participants acknowledge, or intro elapses
//! - ACTIVE → ENDED: conversation timer runs out, or either side closes
//! - PENDING_INTRO → ENDED: either side closes before activation
//! - PENDING_INTRO | ACTIVE → CANCELLED: a participant leaves or is evicted
//!
//! Entering ACTIVE opens the conversation session; the handle goes out as a
//! `SessionOpened` event for the chat service. Any terminal transition sends
//! both participants back to the queue.

use crate::core::store::Tables;
use crate::types::{
    EngineConfig, EngineError, EngineEvent, EngineResult, EntryId, MatchActionResult,
    MatchId, MatchStatus, ReasonCode, SessionHandle, SessionId,
};

#[derive(Debug, Clone)]
pub struct MatchLifecycle {
    success_intro_ms: u64,
    conversation_session_ms: u64,
}

impl MatchLifecycle {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            success_intro_ms: config.success_intro_ms,
            conversation_session_ms: config.conversation_session_ms,
        }
    }

    /// Acknowledge the intro; the second acknowledgement activates the match
    pub fn acknowledge(
        &self,
        t: &mut Tables,
        entry: EntryId,
        match_id: MatchId,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<MatchActionResult> {
        let status = participant_status(t, entry, match_id)?;
        if status == MatchStatus::PendingIntro {
            let fully_acknowledged = match t.match_record_mut(match_id) {
                Some(record) => {
                    if !record.acknowledged_by.contains(&entry) {
                        record.acknowledged_by.push(entry);
                    }
                    record.fully_acknowledged()
                }
                None => false,
            };
            if fully_acknowledged {
                self.activate(t, match_id, now, events);
            }
        }
        Ok(action_result(t, match_id, now, status.is_terminal()))
    }

    /// Close from either side; terminal for both
    pub fn close(
        &self,
        t: &mut Tables,
        entry: EntryId,
        match_id: MatchId,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<MatchActionResult> {
        let status = participant_status(t, entry, match_id)?;
        if !status.is_terminal() {
            tracing::info!(match_id = %match_id, by = %entry, "Match closed by participant");
            finish(t, match_id, MatchStatus::Ended, now, events);
        }
        Ok(action_result(t, match_id, now, status.is_terminal()))
    }

    /// Timer-driven transitions: intro activation and conversation expiry
    pub fn advance(&self, t: &mut Tables, now: u64, events: &mut Vec<EngineEvent>) -> (usize, usize) {
        let mut to_activate = Vec::new();
        let mut to_end = Vec::new();
        for record in t.open_matches() {
            match record.status {
                MatchStatus::PendingIntro if now.saturating_sub(record.created_at) >= self.success_intro_ms => {
                    to_activate.push(record.id);
                }
                MatchStatus::Active if record.conversation_ends_at.is_some_and(|end| now >= end) => {
                    to_end.push(record.id);
                }
                _ => {}
            }
        }

        for id in &to_activate {
            self.activate(t, *id, now, events);
        }
        for id in &to_end {
            tracing::info!(match_id = %id, "Conversation timed out");
            finish(t, *id, MatchStatus::Ended, now, events);
        }
        (to_activate.len(), to_end.len())
    }

    fn activate(&self, t: &mut Tables, match_id: MatchId, now: u64, events: &mut Vec<EngineEvent>) {
        if !t.transition_match(match_id, MatchStatus::Active, now) {
            return;
        }
        let Some(record) = t.match_record_mut(match_id) else {
            return;
        };
        let session_id = SessionId::new();
        let ends_at = now + self.conversation_session_ms;
        record.session_id = Some(session_id);
        record.conversation_ends_at = Some(ends_at);

        let session = SessionHandle {
            session_id,
            match_id,
            participants: record.participants(),
            ends_at,
        };
        tracing::info!(match_id = %match_id, session = %session_id, ends_at, "Conversation session opened");
        events.push(EngineEvent::SessionOpened { session, at: now });
    }
}

/// Cancel the entry's open match because it is leaving the queue
pub fn cancel_open_match(t: &mut Tables, entry: EntryId, now: u64, events: &mut Vec<EngineEvent>) -> Option<MatchId> {
    let match_id = t.open_match_of(entry).map(|m| m.id)?;
    tracing::info!(match_id = %match_id, departed = %entry, "Match cancelled by departure");
    finish(t, match_id, MatchStatus::Cancelled, now, events).then_some(match_id)
}

/// Move to a terminal status; participants fall back to `queued`
fn finish(t: &mut Tables, match_id: MatchId, status: MatchStatus, now: u64, events: &mut Vec<EngineEvent>) -> bool {
    if !t.transition_match(match_id, status, now) {
        return false;
    }
    if let Some(record) = t.match_record(match_id) {
        events.push(EngineEvent::MatchClosed {
            match_id,
            participants: record.participants(),
            status,
            at: now,
        });
    }
    true
}

fn participant_status(t: &Tables, entry: EntryId, match_id: MatchId) -> EngineResult<MatchStatus> {
    let record = t.match_record(match_id).ok_or(EngineError::MatchNotFound(match_id))?;
    if !record.involves(entry) {
        return Err(EngineError::NotParticipant { entry, match_id });
    }
    Ok(record.status)
}

fn action_result(t: &Tables, match_id: MatchId, now: u64, was_closed: bool) -> MatchActionResult {
    let status = t.match_record(match_id).map(|m| m.status).unwrap_or(MatchStatus::Ended);
    MatchActionResult {
        ok: true,
        match_id,
        status,
        reason: was_closed.then_some(ReasonCode::AlreadyClosed),
        server_now: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FocusWindow, Match, PressEvent, PressEventId, QueueEntry, QueueStatus};

    fn lifecycle() -> MatchLifecycle {
        MatchLifecycle::new(&EngineConfig::default())
    }

    fn open_match(t: &mut Tables) -> (MatchId, EntryId, EntryId) {
        let a = QueueEntry::new("a", None, None, 0);
        let b = QueueEntry::new("b", None, None, 0);
        let (mut p1, mut p2) = (a.id, b.id);
        if p2 < p1 {
            std::mem::swap(&mut p1, &mut p2);
        }
        t.insert_entry(a);
        t.insert_entry(b);
        let window = FocusWindow::new(p1, p2, 0, 3000);
        let record = Match {
            id: MatchId::new(),
            participant_a: p1,
            participant_b: p2,
            press_a: PressEvent::start(&window, 0).id,
            press_b: PressEventId::new(),
            focus_window_id: window.id,
            status: MatchStatus::PendingIntro,
            created_at: 1000,
            window_start: 0,
            window_end: 3000,
            overlap_ms: 1500,
            acknowledged_by: Vec::new(),
            session_id: None,
            conversation_ends_at: None,
            ended_at: None,
        };
        let id = record.id;
        t.insert_match(record);
        (id, p1, p2)
    }

    #[test]
    fn test_double_ack_activates_with_session() {
        let mut t = Tables::default();
        let (id, p1, p2) = open_match(&mut t);
        let mut events = Vec::new();

        let first = lifecycle().acknowledge(&mut t, p1, id, 1200, &mut events).unwrap();
        assert_eq!(first.status, MatchStatus::PendingIntro);
        let second = lifecycle().acknowledge(&mut t, p2, id, 1300, &mut events).unwrap();
        assert_eq!(second.status, MatchStatus::Active);

        let record = t.match_record(id).unwrap();
        assert_eq!(record.conversation_ends_at, Some(1300 + 120_000));
        assert!(record.session_id.is_some());
        assert!(matches!(events.as_slice(), [EngineEvent::SessionOpened { .. }]));
    }

    #[test]
    fn test_intro_auto_activates_then_conversation_expires() {
        let mut t = Tables::default();
        let (id, p1, p2) = open_match(&mut t);
        let mut events = Vec::new();

        assert_eq!(lifecycle().advance(&mut t, 4999, &mut events), (0, 0));
        assert_eq!(lifecycle().advance(&mut t, 5000, &mut events), (1, 0));
        assert_eq!(lifecycle().advance(&mut t, 124_999, &mut events), (0, 0));
        assert_eq!(lifecycle().advance(&mut t, 125_000, &mut events), (0, 1));

        assert_eq!(t.match_record(id).map(|m| m.status), Some(MatchStatus::Ended));
        for entry in [p1, p2] {
            assert_eq!(t.entry(entry).map(|e| e.queue_status), Some(QueueStatus::Queued));
        }
    }

    #[test]
    fn test_close_is_terminal_for_both_and_idempotent() {
        let mut t = Tables::default();
        let (id, p1, p2) = open_match(&mut t);
        let mut events = Vec::new();

        let closed = lifecycle().close(&mut t, p1, id, 2000, &mut events).unwrap();
        assert_eq!(closed.status, MatchStatus::Ended);
        assert!(closed.reason.is_none());

        let again = lifecycle().close(&mut t, p2, id, 2100, &mut events).unwrap();
        assert_eq!(again.reason, Some(ReasonCode::AlreadyClosed));
        assert!(t.open_match_of(p1).is_none());
        assert!(t.open_match_of(p2).is_none());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_outsider_cannot_close() {
        let mut t = Tables::default();
        let (id, _, _) = open_match(&mut t);
        let outsider = EntryId::new();
        let mut events = Vec::new();

        let err = lifecycle().close(&mut t, outsider, id, 2000, &mut events).unwrap_err();
        assert_eq!(err.reason(), ReasonCode::NotParticipant);
        let err = lifecycle().close(&mut t, outsider, MatchId::new(), 2000, &mut events).unwrap_err();
        assert_eq!(err.reason(), ReasonCode::MatchNotFound);
    }

    #[test]
    fn test_departure_cancels_active_match() {
        let mut t = Tables::default();
        let (id, p1, p2) = open_match(&mut t);
        let mut events = Vec::new();
        lifecycle().advance(&mut t, 5000, &mut events);

        assert_eq!(cancel_open_match(&mut t, p1, 6000, &mut events), Some(id));
        assert_eq!(t.match_record(id).map(|m| m.status), Some(MatchStatus::Cancelled));
        assert_eq!(t.entry(p2).map(|e| e.queue_status), Some(QueueStatus::Queued));
        assert_eq!(cancel_open_match(&mut t, p1, 6001, &mut events), None);
    }
}
