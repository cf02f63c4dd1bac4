use thiserror::Error;

use crate::game::Difficulty;
use crate::game::session::MAX_NAME_CHARS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("name required")]
    NameRequired,

    #[error("name too long ({actual} characters, max {max})", max = MAX_NAME_CHARS)]
    NameTooLong { actual: usize },

    #[error(
        "a {difficulty} deck needs {needed} paired cards, got {cards}",
        needed = .difficulty.pair_count() * 2
    )]
    DeckMismatch { difficulty: Difficulty, cards: usize },

    #[error("no active session to restart")]
    NoActiveSession,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store key `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid store key `{0}`")]
    InvalidKey(String),
}

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode leaderboard: {0}")]
    Encode(#[from] serde_json::Error),
}
