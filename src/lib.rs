//! Soulmatch: realtime reciprocal matchmaking engine
//!
//! Participants join a presence queue, get a rotating focus target, and
//! press-and-hold on it. Two participants holding on each other inside
//! valid focus windows form a match, which opens a timed conversation.

pub mod core;
pub mod types;

// =============================================================================
// TIMING [C] - server-authoritative reference values
// =============================================================================

/// Minimum continuous hold before a press becomes ready (milliseconds)
pub const MIN_HOLD_MS: u64 = 1500;

/// How long a focus target stays pressable (milliseconds)
pub const FOCUS_WINDOW_DURATION_MS: u64 = 3000;

/// Expected client heartbeat cadence (milliseconds)
pub const HEARTBEAT_INTERVAL_MS: u64 = 15000;

/// Heartbeat age after which an entry is evicted (milliseconds)
/// Roughly 3x the heartbeat interval
pub const STALE_AFTER_MS: u64 = 45000;

/// Length of the post-match conversation (milliseconds)
pub const CONVERSATION_SESSION_MS: u64 = 120_000;

/// Intro phase before a match auto-activates (milliseconds)
/// Zero skips the intro: the match activates on the next maintenance pass
pub const SUCCESS_INTRO_MS: u64 = 4000;

/// Upper bound on a single pending press (milliseconds)
pub const MAX_PRESS_DURATION_MS: u64 = 6000;

// =============================================================================
// MAINTENANCE [C]
// =============================================================================

/// Background maintenance cadence for the server (milliseconds)
pub const TICK_INTERVAL_MS: u64 = 250;

/// How long terminal records are kept before pruning (milliseconds)
pub const RETENTION_MS: u64 = 600_000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
