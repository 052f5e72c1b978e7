//! Machine-readable reason codes returned to clients
//!
//! Clients branch on `code()`; human copy lives in the client.

use serde::{Deserialize, Serialize};

/// Reason attached to a rejected or no-op command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    // =========================================================================
    // Retry signals (not errors)
    // =========================================================================
    /// Hold not long enough yet, retry shortly
    MinHold,
    /// Match already closed, nothing to do
    AlreadyClosed,

    // =========================================================================
    // Expected rejections - client resynchronizes
    // =========================================================================
    /// Supplied window/target is not the caller's current valid window
    FocusWindowMismatch,
    /// Caller is already in an open match
    AlreadyMatched,
    /// Queue entry is unknown, inactive or evicted
    NotFound,
    /// Press event unknown or owned by someone else
    PressNotFound,
    /// Press already cancelled or expired
    PressNotActive,
    /// Match unknown
    MatchNotFound,
    /// Caller is not a participant of the match
    NotParticipant,

    // =========================================================================
    // Fatal - client restarts from join
    // =========================================================================
    /// Malformed identity reference
    InvalidIdentity,
    /// Request id or body could not be parsed
    MalformedRequest,
}

impl ReasonCode {
    /// Wire code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MinHold => "min_hold",
            Self::AlreadyClosed => "already_closed",
            Self::FocusWindowMismatch => "focus_window_mismatch",
            Self::AlreadyMatched => "already_matched",
            Self::NotFound => "not_found",
            Self::PressNotFound => "press_not_found",
            Self::PressNotActive => "press_not_active",
            Self::MatchNotFound => "match_not_found",
            Self::NotParticipant => "not_participant",
            Self::InvalidIdentity => "invalid_identity",
            Self::MalformedRequest => "malformed_request",
        }
    }

    /// Short description for logs
    pub fn description(&self) -> &'static str {
        match self {
            Self::MinHold => "Hold below minimum duration",
            Self::AlreadyClosed => "Match already closed",
            Self::FocusWindowMismatch => "Focus window stale or mismatched",
            Self::AlreadyMatched => "Already in an open match",
            Self::NotFound => "Queue entry not found",
            Self::PressNotFound => "Press event not found",
            Self::PressNotActive => "Press event no longer active",
            Self::MatchNotFound => "Match not found",
            Self::NotParticipant => "Not a match participant",
            Self::InvalidIdentity => "Malformed identity",
            Self::MalformedRequest => "Malformed request",
        }
    }

    /// Fatal reasons end the client's flow; everything else is a resync
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidIdentity | Self::MalformedRequest)
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
