//! Engine events published to subscribers (websocket clients, chat service)

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, MatchId, MatchStatus, SessionHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Joined { entry_id: EntryId, at: u64 },
    Left { entry_id: EntryId, at: u64 },
    Evicted { entry_id: EntryId, at: u64 },
    MatchFormed { match_id: MatchId, participants: [EntryId; 2], at: u64 },
    /// Hand-off to the ephemeral chat service
    SessionOpened { session: SessionHandle, at: u64 },
    MatchClosed { match_id: MatchId, participants: [EntryId; 2], status: MatchStatus, at: u64 },
}

impl EngineEvent {
    /// Does this event concern `entry`?
    pub fn involves(&self, entry: EntryId) -> bool {
        match self {
            Self::Joined { entry_id, .. } | Self::Left { entry_id, .. } | Self::Evicted { entry_id, .. } => {
                *entry_id == entry
            }
            Self::MatchFormed { participants, .. } | Self::MatchClosed { participants, .. } => {
                participants.contains(&entry)
            }
            Self::SessionOpened { session, .. } => session.participants.contains(&entry),
        }
    }
}
