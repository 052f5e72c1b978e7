//! Client state projection
//!
//! Read-only view handed to a polling or subscribed client.

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, FocusWindowId, MatchId, MatchStatus, PressEventId, QueueStatus, SessionId};

/// Everything one participant needs to render the match screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub server_now: u64,
    pub queue_snapshot: QueueSnapshot,
    pub focus_window: Option<FocusWindowView>,
    pub focus_target: Option<ParticipantView>,
    pub self_hold: Option<HoldView>,
    /// Only present once the focus target is pressing the caller back
    pub partner_hold: Option<PartnerHoldView>,
    pub active_match: Option<MatchView>,
}

impl ClientState {
    /// Projection for an unknown or departed entry
    pub fn inactive(server_now: u64) -> Self {
        Self {
            server_now,
            queue_snapshot: QueueSnapshot {
                self_entry: None,
                online_candidates: Vec::new(),
                queue_count: 0,
                estimated_wait_ms: None,
                status: QueueStatus::Inactive,
            },
            focus_window: None,
            focus_target: None,
            self_hold: None,
            partner_hold: None,
            active_match: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    #[serde(rename = "self")]
    pub self_entry: Option<SelfPresence>,
    pub online_candidates: Vec<CandidateView>,
    /// All active entries, including the caller
    pub queue_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_ms: Option<u64>,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfPresence {
    pub entry_id: EntryId,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub joined_at: u64,
    pub last_heartbeat_at: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub entry_id: EntryId,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub joined_at: u64,
    pub last_heartbeat_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusWindowView {
    pub id: FocusWindowId,
    pub starts_at: u64,
    pub ends_at: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub entry_id: EntryId,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldView {
    pub press_event_id: PressEventId,
    pub progress_ms: u64,
    /// elapsed / minHoldMs, clamped to [0, 1]
    pub progress_ratio: f64,
    pub is_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerHoldView {
    pub entry_id: EntryId,
    pub progress_ms: u64,
    pub progress_ratio: f64,
    pub is_ready: bool,
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub matched_user: ParticipantView,
    pub focus_window_id: FocusWindowId,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_ends_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Clamp a progress ratio to [0, 1]; non-finite input becomes 0
pub fn clamp_progress(ratio: f64) -> f64 {
    if !ratio.is_finite() || ratio <= 0.0 {
        0.0
    } else if ratio >= 1.0 {
        1.0
    } else {
        ratio
    }
}
