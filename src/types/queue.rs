//! Queue entry: one participant's active matchmaking membership

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, QueueStatus};

/// One queued participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: EntryId,
    /// Stable user reference from the identity service
    pub owner_identity: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub joined_at: u64,
    pub last_heartbeat_at: u64,
    pub is_active: bool,
    /// When the entry left or was evicted
    pub left_at: Option<u64>,
    /// Set by the focus scheduler
    pub current_target_id: Option<EntryId>,
    pub queue_status: QueueStatus,
}

impl QueueEntry {
    /// Create a freshly joined entry
    pub fn new(
        owner_identity: impl Into<String>,
        display_name: Option<String>,
        avatar_ref: Option<String>,
        now: u64,
    ) -> Self {
        Self {
            id: EntryId::new(),
            owner_identity: owner_identity.into(),
            display_name,
            avatar_ref,
            joined_at: now,
            last_heartbeat_at: now,
            is_active: true,
            left_at: None,
            current_target_id: None,
            queue_status: QueueStatus::Queued,
        }
    }

    /// Milliseconds since the last heartbeat
    pub fn heartbeat_age(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_heartbeat_at)
    }

    /// Stale once the heartbeat age strictly exceeds `stale_after_ms`
    pub fn is_stale(&self, now: u64, stale_after_ms: u64) -> bool {
        self.heartbeat_age(now) > stale_after_ms
    }
}
