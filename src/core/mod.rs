//! Core modules for the matchmaking engine

pub mod clock;
pub mod store;
pub mod presence;
pub mod scheduler;
pub mod press;
pub mod matcher;
pub mod lifecycle;
pub mod projector;
pub mod engine;
pub mod api;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{MemoryStore, Store, Tables};
pub use presence::{PresenceQueue, DepartureCause};
pub use scheduler::FocusScheduler;
pub use press::PressTracker;
pub use matcher::ReciprocityMatcher;
pub use lifecycle::MatchLifecycle;
pub use projector::ClientStateProjector;
pub use engine::{Engine, TickReport};
pub use api::{create_router, run_server};
