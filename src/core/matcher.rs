//! Reciprocity matcher
//!
//! Two presses A (P1 → P2) and B (P2 → P1) reciprocate iff:
//! 1. both are READY
//! 2. both focus windows are valid at the evaluation instant
//! 3. neither pressor is already in an open match
//!
//! Evaluation runs inside one store write transaction, which is the
//! serialized decision point for the pair: whichever commit gets there
//! second forms the match, and the other one observes it. Matches are keyed
//! by `PairKey` (smaller entry id first) so a pair can never hold two open
//! matches.
//!
//! There is no first-mover advantage. Evaluation is symmetric and only
//! cares that both holds were ready inside valid windows.

use crate::core::store::Tables;
use crate::types::{
    EngineEvent, EntryId, FocusWindow, Match, MatchId, MatchStatus, PairKey,
    PressEvent, PressEventId, PressStatus,
};

#[derive(Debug, Clone, Default)]
pub struct ReciprocityMatcher;

impl ReciprocityMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Try to pair `press_id` with a reciprocal press, judged as of `at`
    ///
    /// `at` is the engine time for commits. Grace evaluation passes the
    /// last valid instant of an outgoing window instead. Returns the match
    /// the press belongs to, if any.
    pub fn evaluate(
        &self,
        t: &mut Tables,
        press_id: PressEventId,
        at: u64,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> Option<MatchId> {
        let press = t.press(press_id)?.clone();
        if press.status == PressStatus::Matched {
            return t
                .open_match_of(press.pressor_entry_id)
                .filter(|m| m.press_a == press_id || m.press_b == press_id)
                .map(|m| m.id);
        }
        if !press.is_ready_at(at) {
            return None;
        }

        let pressor = press.pressor_entry_id;
        let partner = press.target_entry_id;
        if pressor == partner {
            return None;
        }
        let partner_press = t
            .live_press_of(partner)
            .filter(|p| p.reciprocates(&press) && p.is_ready_at(at))
            .cloned()?;

        if t.active_entry(pressor).is_none() || t.active_entry(partner).is_none() {
            return None;
        }
        let pair = PairKey::new(pressor, partner);
        if let Some(existing) = t.open_match_for_pair(pair) {
            return Some(existing.id);
        }
        if t.open_match_of(pressor).is_some() || t.open_match_of(partner).is_some() {
            tracing::debug!(pressor = %pressor, partner = %partner, "Reciprocal hold blocked by open match");
            return None;
        }

        Some(self.form_match(t, pair, press, partner_press, at, now, events))
    }

    /// Grace check for a window about to be superseded
    ///
    /// Evaluates the viewer's ready press as of the window's last valid
    /// millisecond, so a late rotation tick cannot drop a pair that was
    /// already reciprocal inside the window.
    pub fn evaluate_grace(
        &self,
        t: &mut Tables,
        viewer: EntryId,
        outgoing: &FocusWindow,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> Option<MatchId> {
        let press_id = t
            .press_for_window(viewer, outgoing.id)
            .filter(|p| p.status == PressStatus::Ready)
            .map(|p| p.id)?;
        let last_valid = outgoing.ends_at.saturating_sub(1).min(now);
        let matched = self.evaluate(t, press_id, last_valid, now, events);
        if matched.is_some() {
            tracing::info!(viewer = %viewer, window = %outgoing.id, "Grace evaluation matched outgoing window");
        }
        matched
    }

    #[allow(clippy::too_many_arguments)]
    fn form_match(
        &self,
        t: &mut Tables,
        pair: PairKey,
        press: PressEvent,
        partner_press: PressEvent,
        at: u64,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> MatchId {
        let (press_a, press_b) = if press.pressor_entry_id == pair.low() {
            (press, partner_press)
        } else {
            (partner_press, press)
        };

        let both_started = press_a.started_at.max(press_b.started_at);
        let record = Match {
            id: MatchId::new(),
            participant_a: pair.low(),
            participant_b: pair.high(),
            press_a: press_a.id,
            press_b: press_b.id,
            focus_window_id: press_a.focus_window_id,
            status: MatchStatus::PendingIntro,
            created_at: now,
            window_start: press_a.window_starts_at.max(press_b.window_starts_at),
            window_end: press_a.window_ends_at.min(press_b.window_ends_at),
            overlap_ms: at.saturating_sub(both_started),
            acknowledged_by: Vec::new(),
            session_id: None,
            conversation_ends_at: None,
            ended_at: None,
        };
        let match_id = record.id;
        let participants = record.participants();

        t.transition_press(press_a.id, PressStatus::Matched, now);
        t.transition_press(press_b.id, PressStatus::Matched, now);
        for participant in participants {
            t.clear_window(participant);
        }
        t.insert_match(record);

        tracing::info!(
            match_id = %match_id,
            a = %participants[0],
            b = %participants[1],
            "Reciprocal match formed"
        );
        events.push(EngineEvent::MatchFormed { match_id, participants, at: now });
        match_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueueEntry, QueueStatus};

    struct Pair {
        t: Tables,
        p1: EntryId,
        p2: EntryId,
        w1: FocusWindow,
        w2: FocusWindow,
    }

    fn mutual_pair() -> Pair {
        let mut t = Tables::default();
        let a = QueueEntry::new("p1", None, None, 0);
        let b = QueueEntry::new("p2", None, None, 0);
        let (p1, p2) = (a.id, b.id);
        t.insert_entry(a);
        t.insert_entry(b);
        let w1 = FocusWindow::new(p1, p2, 0, 3000);
        let w2 = FocusWindow::new(p2, p1, 0, 3000);
        t.set_window(w1.clone());
        t.set_window(w2.clone());
        Pair { t, p1, p2, w1, w2 }
    }

    fn ready_press(t: &mut Tables, window: &FocusWindow, start: u64, ready: u64) -> PressEventId {
        let press = PressEvent::start(window, start);
        let id = press.id;
        t.insert_press(press);
        assert!(t.transition_press(id, PressStatus::Ready, ready));
        id
    }

    #[test]
    fn test_one_sided_ready_does_not_match() {
        let Pair { mut t, p1, w1, .. } = mutual_pair();
        let press = ready_press(&mut t, &w1, 0, 1600);
        let mut events = Vec::new();

        assert!(ReciprocityMatcher::new().evaluate(&mut t, press, 1600, 1600, &mut events).is_none());
        assert_eq!(t.press(press).map(|p| p.status), Some(PressStatus::Ready));
        assert!(t.open_match_of(p1).is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn test_reciprocal_ready_forms_single_match() {
        let Pair { mut t, p1, p2, w1, w2 } = mutual_pair();
        let a = ready_press(&mut t, &w1, 100, 1650);
        let b = ready_press(&mut t, &w2, 200, 1700);
        let matcher = ReciprocityMatcher::new();
        let mut events = Vec::new();

        let first = matcher.evaluate(&mut t, b, 1700, 1700, &mut events);
        let second = matcher.evaluate(&mut t, a, 1700, 1700, &mut events);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(events.len(), 1);
        let record = t.match_record(first.unwrap()).unwrap();
        assert_eq!(record.status, MatchStatus::PendingIntro);
        assert_eq!(record.overlap_ms, 1500);
        assert!(record.participant_a < record.participant_b);
        for press in [a, b] {
            assert_eq!(t.press(press).map(|p| p.status), Some(PressStatus::Matched));
        }
        for entry in [p1, p2] {
            assert_eq!(t.entry(entry).map(|e| e.queue_status), Some(QueueStatus::Matched));
            assert!(t.window_for(entry).is_none());
        }
    }

    #[test]
    fn test_expired_window_blocks_match() {
        let Pair { mut t, w1, w2, .. } = mutual_pair();
        let a = ready_press(&mut t, &w1, 0, 1500);
        ready_press(&mut t, &w2, 0, 1600);
        let mut events = Vec::new();

        assert!(ReciprocityMatcher::new().evaluate(&mut t, a, 3000, 3000, &mut events).is_none());
    }

    #[test]
    fn test_grace_matches_pair_ready_inside_window() {
        let Pair { mut t, p1, w1, w2, .. } = mutual_pair();
        ready_press(&mut t, &w1, 0, 1500);
        ready_press(&mut t, &w2, 0, 2900);
        let mut events = Vec::new();

        let matched = ReciprocityMatcher::new().evaluate_grace(&mut t, p1, &w1, 3100, &mut events);
        assert!(matched.is_some());
        assert_eq!(t.match_record(matched.unwrap()).map(|m| m.created_at), Some(3100));
    }

    #[test]
    fn test_partner_targeting_third_party_never_matches() {
        let Pair { mut t, p1, p2, w1, .. } = mutual_pair();
        let c = QueueEntry::new("p3", None, None, 0);
        let p3 = c.id;
        t.insert_entry(c);
        let w2_to_p3 = FocusWindow::new(p2, p3, 0, 3000);
        t.set_window(w2_to_p3.clone());

        let a = ready_press(&mut t, &w1, 0, 1500);
        ready_press(&mut t, &w2_to_p3, 0, 1500);
        let mut events = Vec::new();

        assert!(ReciprocityMatcher::new().evaluate(&mut t, a, 1600, 1600, &mut events).is_none());
        assert!(t.open_match_of(p1).is_none());
        assert!(t.open_match_of(p2).is_none());
    }
}
