pub mod leaderboard;
pub mod profile;
pub mod store;

pub use leaderboard::{
    LEADERBOARD_CAPACITY, LEADERBOARD_KEY, LeaderboardStore, ScoreEntry, format_mm_ss,
    rank_entries,
};
pub use profile::{DEFAULT_PLAYER_NAME, PlayerProfile, ProfileStore};
pub use store::{FileStore, KeyValueStore, MemoryStore};
