use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::KeyValueStore;
use crate::error::LeaderboardError;
use crate::game::{Difficulty, FinishedGame};

pub const LEADERBOARD_KEY: &str = "leaderboard";
pub const LEADERBOARD_CAPACITY: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player_name: String,
    pub difficulty: Difficulty,
    pub elapsed_seconds: u32,
    pub move_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl ScoreEntry {
    pub fn new(
        player_name: impl Into<String>,
        difficulty: Difficulty,
        elapsed_seconds: u32,
        move_count: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        ScoreEntry {
            player_name: player_name.into(),
            difficulty,
            elapsed_seconds,
            move_count,
            timestamp,
        }
    }

    pub fn from_finished(record: &FinishedGame, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            record.player_name.clone(),
            record.difficulty,
            record.elapsed_seconds,
            record.move_count,
            timestamp,
        )
    }

    /// Lower time wins, then fewer moves.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.elapsed_seconds
            .cmp(&other.elapsed_seconds)
            .then_with(|| self.move_count.cmp(&other.move_count))
    }

    pub fn time_label(&self) -> String {
        format_mm_ss(self.elapsed_seconds)
    }
}

pub fn format_mm_ss(total_secs: u32) -> String {
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}", mins, secs)
}

/// Stable sort by rank, then keep the first `LEADERBOARD_CAPACITY` across
/// all difficulties.
pub fn rank_entries(entries: &mut Vec<ScoreEntry>) {
    entries.sort_by(ScoreEntry::rank_cmp);
    entries.truncate(LEADERBOARD_CAPACITY);
}

#[derive(Debug)]
pub struct LeaderboardStore<K> {
    store: K,
}

impl<K: KeyValueStore> LeaderboardStore<K> {
    pub fn new(store: K) -> Self {
        LeaderboardStore { store }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Full ranked collection. Missing, unreadable or corrupt data reads as empty.
    pub fn entries(&self) -> Vec<ScoreEntry> {
        let raw = match self.store.get(LEADERBOARD_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "leaderboard unreadable, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "leaderboard corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Inserts `entry`, re-ranks and rewrites the whole collection. Returns the
    /// entry's global rank, or `None` when it fell outside the kept window.
    pub fn try_submit(&self, entry: ScoreEntry) -> Result<Option<usize>, LeaderboardError> {
        let mut entries = self.entries();
        rank_entries(&mut entries);
        // After every entry it ties with, as a stable sort would place it.
        let index = entries.partition_point(|kept| kept.rank_cmp(&entry).is_le());
        entries.insert(index, entry);
        entries.truncate(LEADERBOARD_CAPACITY);
        let rank = (index < LEADERBOARD_CAPACITY).then_some(index);

        let encoded = serde_json::to_string(&entries)?;
        self.store.set(LEADERBOARD_KEY, &encoded)?;

        debug!(kept = entries.len(), ?rank, "leaderboard rewritten");
        Ok(rank)
    }

    pub fn submit(&self, entry: ScoreEntry) -> bool {
        let player = entry.player_name.clone();
        match self.try_submit(entry) {
            Ok(rank) => {
                info!(%player, ?rank, "score stored");
                true
            }
            Err(err) => {
                warn!(%player, error = %err, "failed to store score");
                false
            }
        }
    }

    /// First `limit` entries for `difficulty`, in stored rank order.
    pub fn query(&self, difficulty: Difficulty, limit: usize) -> Vec<ScoreEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.difficulty == difficulty)
            .take(limit)
            .collect()
    }

    pub fn best(&self, difficulty: Difficulty) -> Option<ScoreEntry> {
        self.query(difficulty, 1).into_iter().next()
    }

    /// Newest kept entries for `difficulty`.
    pub fn recent(&self, difficulty: Difficulty, limit: usize) -> Vec<ScoreEntry> {
        let mut entries: Vec<_> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.difficulty == difficulty)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }
}
