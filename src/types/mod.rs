//! Core types for the matchmaking engine

mod ids;
mod state;
mod queue;
mod focus;
mod press;
mod matching;
mod reason;
mod error;
mod config;
mod output;
mod snapshot;
mod event;

pub use ids::{EntryId, FocusWindowId, PressEventId, MatchId, SessionId, PairKey};
pub use state::{QueueStatus, PressStatus, MatchStatus};
pub use queue::QueueEntry;
pub use focus::FocusWindow;
pub use press::PressEvent;
pub use matching::{Match, SessionHandle};
pub use reason::ReasonCode;
pub use error::{EngineError, EngineResult};
pub use config::{EngineConfig, ConfigError};
pub use output::{JoinResult, AckResult, PressStartResult, PressCommitResult, PressCancelResult, MatchActionResult, RejectionBody};
pub use snapshot::{
    ClientState, QueueSnapshot, SelfPresence, CandidateView, FocusWindowView,
    ParticipantView, HoldView, PartnerHoldView, MatchView, clamp_progress,
};
pub use event::EngineEvent;
