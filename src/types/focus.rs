//! Focus window: the span during which a viewer may press one target

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, FocusWindowId};

/// One rotation of a viewer's focus target
///
/// Windows are never mutated; the scheduler supersedes them with a new
/// one. Expiry is a pure function of the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusWindow {
    pub id: FocusWindowId,
    pub viewer_entry_id: EntryId,
    pub target_entry_id: EntryId,
    pub starts_at: u64,
    pub ends_at: u64,
}

impl FocusWindow {
    pub fn new(viewer: EntryId, target: EntryId, starts_at: u64, duration_ms: u64) -> Self {
        Self {
            id: FocusWindowId::new(),
            viewer_entry_id: viewer,
            target_entry_id: target,
            starts_at,
            ends_at: starts_at + duration_ms,
        }
    }

    /// Valid on `[starts_at, ends_at)`
    pub fn is_valid_at(&self, at: u64) -> bool {
        at >= self.starts_at && at < self.ends_at
    }

    pub fn is_expired_at(&self, at: u64) -> bool {
        at >= self.ends_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.ends_at - self.starts_at
    }

    pub fn remaining_ms(&self, at: u64) -> u64 {
        self.ends_at.saturating_sub(at)
    }
}
