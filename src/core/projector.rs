//! Client state projector
//!
//! Pure read over the tables for one requesting entry. Never mutates, never
//! rotates; an expired window simply projects as no window until the next
//! maintenance pass replaces it.
//!
//! A partner's hold is shown only when the caller's focus target is holding
//! a live press on the caller. Intent toward anyone else stays private.

use crate::core::press::PressTracker;
use crate::core::store::Tables;
use crate::types::{
    CandidateView, ClientState, EngineConfig, EntryId, FocusWindowView,
    HoldView, MatchView, ParticipantView, PartnerHoldView, PressEvent, PressStatus,
    QueueEntry, QueueSnapshot, SelfPresence,
};

#[derive(Debug, Clone)]
pub struct ClientStateProjector {
    tracker: PressTracker,
    window_ms: u64,
}

impl ClientStateProjector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tracker: PressTracker::new(config),
            window_ms: config.focus_window_duration_ms,
        }
    }

    pub fn project(&self, t: &Tables, entry_id: EntryId, now: u64) -> ClientState {
        let Some(entry) = t.active_entry(entry_id) else {
            return ClientState::inactive(now);
        };

        let window = t.window_for(entry_id).filter(|w| w.is_valid_at(now));
        let focus_target = window
            .and_then(|w| t.active_entry(w.target_entry_id))
            .map(participant_view);

        let self_hold = t
            .live_press_of(entry_id)
            .filter(|p| window.is_some_and(|w| w.id == p.focus_window_id))
            .map(|p| self.hold_view(p, now));

        let partner_hold = window
            .and_then(|w| t.live_press_of(w.target_entry_id))
            .filter(|p| p.target_entry_id == entry_id && p.window_valid_at(now))
            .map(|p| {
                let (progress_ms, progress_ratio) = self.tracker.progress(p, now);
                PartnerHoldView {
                    entry_id: p.pressor_entry_id,
                    progress_ms,
                    progress_ratio,
                    is_ready: p.status == PressStatus::Ready,
                    is_visible: true,
                }
            });

        let active_match = t.open_match_of(entry_id).and_then(|m| {
            let partner = m.partner_of(entry_id)?;
            let matched_user = t
                .entry(partner)
                .map(participant_view)
                .unwrap_or(ParticipantView {
                    entry_id: partner,
                    display_name: None,
                    avatar_ref: None,
                });
            Some(MatchView {
                match_id: m.id,
                status: m.status,
                matched_user,
                focus_window_id: m.focus_window_id,
                created_at: m.created_at,
                conversation_ends_at: m.conversation_ends_at,
                session_id: m.session_id,
            })
        });

        ClientState {
            server_now: now,
            queue_snapshot: self.queue_snapshot(t, entry),
            focus_window: window.map(|w| FocusWindowView {
                id: w.id,
                starts_at: w.starts_at,
                ends_at: w.ends_at,
                duration_ms: w.duration_ms(),
            }),
            focus_target,
            self_hold,
            partner_hold,
            active_match,
        }
    }

    fn queue_snapshot(&self, t: &Tables, entry: &QueueEntry) -> QueueSnapshot {
        let active = t.active_entries();
        let online_candidates: Vec<CandidateView> = active
            .iter()
            .filter(|e| e.id != entry.id && t.open_match_of(e.id).is_none())
            .map(|e| CandidateView {
                entry_id: e.id,
                display_name: e.display_name.clone(),
                avatar_ref: e.avatar_ref.clone(),
                joined_at: e.joined_at,
                last_heartbeat_at: e.last_heartbeat_at,
            })
            .collect();
        // One window per candidate before the rotation comes back around
        let estimated_wait_ms = (!online_candidates.is_empty())
            .then(|| self.window_ms * online_candidates.len() as u64);

        QueueSnapshot {
            self_entry: Some(SelfPresence {
                entry_id: entry.id,
                display_name: entry.display_name.clone(),
                avatar_ref: entry.avatar_ref.clone(),
                joined_at: entry.joined_at,
                last_heartbeat_at: entry.last_heartbeat_at,
                is_active: entry.is_active,
            }),
            online_candidates,
            queue_count: active.len(),
            estimated_wait_ms,
            status: entry.queue_status,
        }
    }

    fn hold_view(&self, press: &PressEvent, now: u64) -> HoldView {
        let (progress_ms, progress_ratio) = self.tracker.progress(press, now);
        HoldView {
            press_event_id: press.id,
            progress_ms,
            progress_ratio,
            is_ready: press.status == PressStatus::Ready,
        }
    }
}

fn participant_view(entry: &QueueEntry) -> ParticipantView {
    ParticipantView {
        entry_id: entry.id,
        display_name: entry.display_name.clone(),
        avatar_ref: entry.avatar_ref.clone(),
    }
}
