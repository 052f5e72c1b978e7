//! Status enums for queue entries, presses and matches

use serde::{Deserialize, Serialize};

/// Where a queue entry is in the matchmaking flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Left the queue or evicted
    Inactive,
    /// In rotation, not pressing
    Queued,
    /// Holding a pending or ready press
    Matching,
    /// Participant of an open match, out of rotation
    Matched,
}

/// Lifecycle of a single press-intent
///
/// - PENDING → READY | CANCELLED | EXPIRED
/// - READY → MATCHED | EXPIRED
/// - READY → CANCELLED only when the pressor departs (leave or eviction);
///   a client release never cancels a ready press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressStatus {
    Pending,
    Ready,
    Matched,
    Expired,
    Cancelled,
}

impl PressStatus {
    /// Whether `next` is a legal forward transition from this status
    pub fn can_transition_to(&self, next: PressStatus) -> bool {
        use PressStatus::*;
        matches!(
            (self, next),
            (Pending, Ready)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Ready, Matched)
                | (Ready, Expired)
                | (Ready, Cancelled)
        )
    }

    /// Still held and eligible for matching
    pub fn is_live(&self) -> bool {
        matches!(self, PressStatus::Pending | PressStatus::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }
}

/// Lifecycle of a match
///
/// - PENDING_INTRO → ACTIVE | ENDED | CANCELLED
/// - ACTIVE → ENDED | CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    PendingIntro,
    Active,
    Ended,
    Cancelled,
}

impl MatchStatus {
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (PendingIntro, Active)
                | (PendingIntro, Ended)
                | (PendingIntro, Cancelled)
                | (Active, Ended)
                | (Active, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Ended | MatchStatus::Cancelled)
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QueueStatus::Inactive => "inactive",
            QueueStatus::Queued => "queued",
            QueueStatus::Matching => "matching",
            QueueStatus::Matched => "matched",
        };
        write!(f, "{}", name)
    }
}

impl std::fmt::Display for PressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PressStatus::Pending => "pending",
            PressStatus::Ready => "ready",
            PressStatus::Matched => "matched",
            PressStatus::Expired => "expired",
            PressStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchStatus::PendingIntro => "pending_intro",
            MatchStatus::Active => "active",
            MatchStatus::Ended => "ended",
            MatchStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}
