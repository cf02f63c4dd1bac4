use tracing::warn;

use super::store::KeyValueStore;
use crate::error::StoreError;
use crate::game::Difficulty;

pub const USERNAME_KEY: &str = "username";
pub const DIFFICULTY_KEY: &str = "difficulty";
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Last player name and difficulty chosen on the setup screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerProfile {
    pub name: String,
    pub difficulty: Difficulty,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        PlayerProfile {
            name: DEFAULT_PLAYER_NAME.to_string(),
            difficulty: Difficulty::Easy,
        }
    }
}

#[derive(Debug)]
pub struct ProfileStore<K> {
    store: K,
}

impl<K: KeyValueStore> ProfileStore<K> {
    pub fn new(store: K) -> Self {
        ProfileStore { store }
    }

    pub fn remember(&self, profile: &PlayerProfile) -> Result<(), StoreError> {
        self.store.set(USERNAME_KEY, &profile.name)?;
        self.store.set(DIFFICULTY_KEY, profile.difficulty.code())
    }

    pub fn load(&self) -> PlayerProfile {
        let name = self
            .read(USERNAME_KEY)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
        let difficulty = self
            .read(DIFFICULTY_KEY)
            .map(|code| Difficulty::from_code(&code))
            .unwrap_or_default();
        PlayerProfile { name, difficulty }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "profile value unreadable");
                None
            }
        }
    }
}
