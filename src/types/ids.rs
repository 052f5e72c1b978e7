//! Opaque identifiers for engine records
//!
//! All ids are UUID v4 and serialize as their hyphenated string form.
//! Ordering follows the string form, which gives the pair lock its
//! "smaller id first" rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A participant's queue membership
    EntryId
);
define_id!(
    /// One rotation of a viewer's focus target
    FocusWindowId
);
define_id!(
    /// One press-intent instance
    PressEventId
);
define_id!(
    /// A reciprocal match between two entries
    MatchId
);
define_id!(
    /// Conversation session handed to the chat service
    SessionId
);

/// Unordered pair of entries, stored smaller id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: EntryId,
    high: EntryId,
}

impl PairKey {
    pub fn new(a: EntryId, b: EntryId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> EntryId {
        self.low
    }

    pub fn high(&self) -> EntryId {
        self.high
    }
}
