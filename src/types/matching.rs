//! Match record and the session handle passed to the chat service

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, FocusWindowId, MatchId, MatchStatus, PairKey, PressEventId, SessionId};

/// A reciprocal match between two entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    /// Smaller entry id of the pair
    pub participant_a: EntryId,
    pub participant_b: EntryId,
    pub press_a: PressEventId,
    pub press_b: PressEventId,
    /// Window participant A pressed under
    pub focus_window_id: FocusWindowId,
    pub status: MatchStatus,
    pub created_at: u64,
    /// Overlap of both focus windows
    pub window_start: u64,
    pub window_end: u64,
    /// How long both holds overlapped before formation
    pub overlap_ms: u64,
    pub acknowledged_by: Vec<EntryId>,
    pub session_id: Option<SessionId>,
    pub conversation_ends_at: Option<u64>,
    pub ended_at: Option<u64>,
}

impl Match {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.participant_a, self.participant_b)
    }

    pub fn involves(&self, entry: EntryId) -> bool {
        self.participant_a == entry || self.participant_b == entry
    }

    /// The other participant, if `entry` is one of them
    pub fn partner_of(&self, entry: EntryId) -> Option<EntryId> {
        if self.participant_a == entry {
            Some(self.participant_b)
        } else if self.participant_b == entry {
            Some(self.participant_a)
        } else {
            None
        }
    }

    pub fn participants(&self) -> [EntryId; 2] {
        [self.participant_a, self.participant_b]
    }

    pub fn fully_acknowledged(&self) -> bool {
        self.participants().iter().all(|p| self.acknowledged_by.contains(p))
    }
}

/// Handle given to the ephemeral chat service when a match goes active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub match_id: MatchId,
    pub participants: [EntryId; 2],
    pub ends_at: u64,
}
