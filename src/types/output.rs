//! Command results
//!
//! Every result carries `server_now` so clients can reconcile clocks.

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, MatchId, MatchStatus, PressEventId, QueueStatus, ReasonCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    pub entry_id: EntryId,
    pub status: QueueStatus,
    pub joined_at: u64,
    pub server_now: u64,
    /// An active entry already existed for this identity
    pub reused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QueueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    pub server_now: u64,
}

impl AckResult {
    pub fn ok(server_now: u64) -> Self {
        Self { ok: true, status: None, reason: None, server_now }
    }

    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressStartResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub press_event_id: Option<PressEventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    /// Duplicate start returned the existing press
    pub reused: bool,
    pub is_ready: bool,
    pub server_now: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressCommitResult {
    pub ok: bool,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    /// Server-measured hold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub server_now: u64,
}

impl PressCommitResult {
    /// Hold not long enough yet
    pub fn min_hold(duration_ms: u64, server_now: u64) -> Self {
        Self {
            ok: false,
            matched: false,
            match_id: None,
            reason: Some(ReasonCode::MinHold),
            duration_ms: Some(duration_ms),
            server_now,
        }
    }

    /// Press is ready; `match_id` is set once reciprocity fired
    pub fn ready(match_id: Option<MatchId>, duration_ms: u64, server_now: u64) -> Self {
        Self {
            ok: true,
            matched: match_id.is_some(),
            match_id,
            reason: None,
            duration_ms: Some(duration_ms),
            server_now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressCancelResult {
    pub ok: bool,
    /// Cancel lost the race to a ready/matched transition
    pub preserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    pub server_now: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchActionResult {
    pub ok: bool,
    pub match_id: MatchId,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    pub server_now: u64,
}

/// Error body rendered by the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBody {
    pub ok: bool,
    pub reason: ReasonCode,
    pub fatal: bool,
    pub server_now: u64,
}
