//! Presence queue: who is eligible to be matched
//!
//! Explicit leave and staleness eviction share one departure path, so an
//! evicted entry loses its press and open match exactly like one that left.

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::lifecycle::cancel_open_match;
use crate::core::press::cancel_live_press;
use crate::core::store::Tables;
use crate::types::{
    AckResult, EngineConfig, EngineError, EngineEvent, EngineResult, EntryId,
    JoinResult, QueueEntry, QueueStatus,
};

/// Longest display name kept, in characters
const MAX_DISPLAY_NAME_CHARS: usize = 64;

lazy_static! {
    static ref RE_IDENTITY: Regex = Regex::new(r"^[A-Za-z0-9_.:@|-]{1,128}$").unwrap();
}

/// Why an entry is leaving the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureCause {
    Left,
    Evicted,
}

#[derive(Debug, Clone)]
pub struct PresenceQueue {
    stale_after_ms: u64,
}

impl PresenceQueue {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            stale_after_ms: config.stale_after_ms,
        }
    }

    /// Join, or return the identity's existing active entry
    pub fn join(
        &self,
        t: &mut Tables,
        identity: &str,
        display_name: Option<&str>,
        avatar_ref: Option<&str>,
        now: u64,
        events: &mut Vec<EngineEvent>,
    ) -> EngineResult<JoinResult> {
        validate_identity(identity)?;
        let display_name = clean_display_name(display_name);
        let avatar_ref = clean_field(avatar_ref);

        if let Some(existing) = t.active_entry_for_identity(identity).map(|e| e.id) {
            let Some(entry) = t.active_entry_mut(existing) else {
                return Err(EngineError::NotFound(existing));
            };
            entry.last_heartbeat_at = now;
            if display_name.is_some() {
                entry.display_name = display_name;
            }
            if avatar_ref.is_some() {
                entry.avatar_ref = avatar_ref;
            }
            tracing::debug!(entry = %existing, "Join reused active entry");
            return Ok(JoinResult {
                entry_id: entry.id,
                status: entry.queue_status,
                joined_at: entry.joined_at,
                server_now: now,
                reused: true,
            });
        }

        let entry = QueueEntry::new(identity, display_name, avatar_ref, now);
        let result = JoinResult {
            entry_id: entry.id,
            status: entry.queue_status,
            joined_at: entry.joined_at,
            server_now: now,
            reused: false,
        };
        tracing::info!(entry = %entry.id, identity = %identity, "Joined queue");
        t.insert_entry(entry);
        events.push(EngineEvent::Joined { entry_id: result.entry_id, at: now });
        Ok(result)
    }

    pub fn heartbeat(&self, t: &mut Tables, id: EntryId, now: u64) -> EngineResult<AckResult> {
        let entry = t.active_entry_mut(id).ok_or(EngineError::NotFound(id))?;
        entry.last_heartbeat_at = now;
        Ok(AckResult::ok(now).with_status(entry.queue_status))
    }

    /// Idempotent: leaving twice, or leaving an unknown entry, is fine
    pub fn leave(&self, t: &mut Tables, id: EntryId, now: u64, events: &mut Vec<EngineEvent>) -> AckResult {
        depart(t, id, now, DepartureCause::Left, events);
        AckResult::ok(now).with_status(QueueStatus::Inactive)
    }

    /// Evict every entry whose heartbeat is older than the staleness threshold
    pub fn evict_stale(&self, t: &mut Tables, now: u64, events: &mut Vec<EngineEvent>) -> Vec<EntryId> {
        let stale: Vec<EntryId> = t
            .active_entries()
            .into_iter()
            .filter(|e| e.is_stale(now, self.stale_after_ms))
            .map(|e| e.id)
            .collect();
        for id in &stale {
            depart(t, *id, now, DepartureCause::Evicted, events);
        }
        stale
    }
}

/// Single cancellation path for leave and eviction
///
/// Cancels the live press, cancels the open match (returning the partner to
/// the queue), then drops the entry out of rotation.
pub fn depart(t: &mut Tables, id: EntryId, now: u64, cause: DepartureCause, events: &mut Vec<EngineEvent>) -> bool {
    if t.active_entry(id).is_none() {
        return false;
    }
    cancel_live_press(t, id, now);
    cancel_open_match(t, id, now, events);
    t.deactivate_entry(id, now);

    match cause {
        DepartureCause::Left => {
            tracing::info!(entry = %id, "Left queue");
            events.push(EngineEvent::Left { entry_id: id, at: now });
        }
        DepartureCause::Evicted => {
            tracing::info!(entry = %id, "Evicted stale entry");
            events.push(EngineEvent::Evicted { entry_id: id, at: now });
        }
    }
    true
}

fn validate_identity(identity: &str) -> EngineResult<()> {
    if RE_IDENTITY.is_match(identity) {
        Ok(())
    } else {
        Err(EngineError::InvalidIdentity(identity.to_string()))
    }
}

fn clean_field(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn clean_display_name(value: Option<&str>) -> Option<String> {
    clean_field(value).map(|v| v.chars().take(MAX_DISPLAY_NAME_CHARS).collect())
}
