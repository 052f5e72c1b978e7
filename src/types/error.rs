//! Engine errors

use thiserror::Error;
use crate::types::{EntryId, MatchId, PressEventId, ReasonCode};

/// Rejection of an engine command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("queue entry {0} not found or inactive")]
    NotFound(EntryId),

    #[error("focus window mismatch for entry {0}")]
    FocusWindowMismatch(EntryId),

    #[error("entry {0} is already in an open match")]
    AlreadyMatched(EntryId),

    #[error("press event {0} not found")]
    PressNotFound(PressEventId),

    #[error("press event {0} is no longer active")]
    PressNotActive(PressEventId),

    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("entry {entry} is not a participant of match {match_id}")]
    NotParticipant { entry: EntryId, match_id: MatchId },

    #[error("invalid identity reference: {0:?}")]
    InvalidIdentity(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl EngineError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::NotFound(_) => ReasonCode::NotFound,
            Self::FocusWindowMismatch(_) => ReasonCode::FocusWindowMismatch,
            Self::AlreadyMatched(_) => ReasonCode::AlreadyMatched,
            Self::PressNotFound(_) => ReasonCode::PressNotFound,
            Self::PressNotActive(_) => ReasonCode::PressNotActive,
            Self::MatchNotFound(_) => ReasonCode::MatchNotFound,
            Self::NotParticipant { .. } => ReasonCode::NotParticipant,
            Self::InvalidIdentity(_) => ReasonCode::InvalidIdentity,
            Self::MalformedRequest(_) => ReasonCode::MalformedRequest,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.reason().is_fatal()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
