//! Press event: one press-intent toward a focus target

use serde::{Deserialize, Serialize};
use crate::types::{EntryId, FocusWindow, FocusWindowId, PressEventId, PressStatus};

/// A press started under a specific focus window
///
/// Window bounds are copied at creation so expiry checks do not depend
/// on the window still being the viewer's current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressEvent {
    pub id: PressEventId,
    pub pressor_entry_id: EntryId,
    pub target_entry_id: EntryId,
    pub focus_window_id: FocusWindowId,
    pub window_starts_at: u64,
    pub window_ends_at: u64,
    pub started_at: u64,
    /// When the server accepted the hold as long enough
    pub ready_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub status: PressStatus,
    pub duration_ms: Option<u64>,
}

impl PressEvent {
    /// Start a pending press under `window`
    pub fn start(window: &FocusWindow, now: u64) -> Self {
        Self {
            id: PressEventId::new(),
            pressor_entry_id: window.viewer_entry_id,
            target_entry_id: window.target_entry_id,
            focus_window_id: window.id,
            window_starts_at: window.starts_at,
            window_ends_at: window.ends_at,
            started_at: now,
            ready_at: None,
            ended_at: None,
            status: PressStatus::Pending,
            duration_ms: None,
        }
    }

    /// Server-measured hold time
    pub fn elapsed_ms(&self, now: u64) -> u64 {
        let until = self.ended_at.unwrap_or(now);
        until.saturating_sub(self.started_at)
    }

    pub fn window_valid_at(&self, at: u64) -> bool {
        at >= self.window_starts_at && at < self.window_ends_at
    }

    /// Ready no later than `at` and still inside its window at `at`
    pub fn is_ready_at(&self, at: u64) -> bool {
        self.status == PressStatus::Ready
            && self.ready_at.is_some_and(|r| r <= at)
            && self.window_valid_at(at)
    }

    /// Does this press point at `other` while `other` points back?
    pub fn reciprocates(&self, other: &PressEvent) -> bool {
        self.pressor_entry_id == other.target_entry_id && self.target_entry_id == other.pressor_entry_id
    }
}
