//! Memory-matching card game engine with a persistent local leaderboard.
//!
//! - `game`: deck, the flip/match state machine, timers and the event-loop host
//! - `records`: key-value persistence, the ranked leaderboard and the player profile

pub mod error;
pub mod game;
pub mod records;

pub use crate::error::{LeaderboardError, SessionError, StoreError};
pub use crate::game::{
    Card, CardStatus, CardView, Deck, Difficulty, FinishedGame, GameEvent, GameHost, GameSession,
    ManualScheduler, PendingPair, Phase, Rejection, Resolution, Scheduler, Selection, Settled,
    Snapshot, TaskHandle, Timings,
};
#[cfg(feature = "glib")]
pub use crate::game::GlibScheduler;
pub use crate::records::{
    FileStore, KeyValueStore, LeaderboardStore, MemoryStore, PlayerProfile, ProfileStore,
    ScoreEntry,
};
