use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::deck::Deck;
use super::scheduler::TaskHandle;
use super::state::{CardStatus, CardView, Difficulty, Phase};
use crate::error::SessionError;

pub const MAX_NAME_CHARS: usize = 15;

/// Trims the name and checks it against the session preconditions.
pub fn validate_player_name(raw: &str) -> Result<String, SessionError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(SessionError::NameRequired);
    }
    let actual = name.chars().count();
    if actual > MAX_NAME_CHARS {
        return Err(SessionError::NameTooLong { actual });
    }
    Ok(name.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Match,
    Mismatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingPair {
    pub first: usize,
    pub second: usize,
    pub resolution: Resolution,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    AlreadyRevealed,
    AlreadyMatched,
    BufferFull,
    Ended,
    NoSession,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Rejected(Rejection),
    Revealed { index: usize },
    PairRevealed(PendingPair),
}

impl Selection {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Selection::Rejected(_))
    }
}

/// Result of a completed game, handed to the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGame {
    pub player_name: String,
    pub difficulty: Difficulty,
    pub elapsed_seconds: u32,
    pub move_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settled {
    Matched(PendingPair),
    Mismatched(PendingPair),
    Won(PendingPair, FinishedGame),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    CardRevealed { index: usize },
    CardsMatched { first: usize, second: usize },
    CardsHidden { first: usize, second: usize },
    MovesChanged(u32),
    MatchesChanged(u32),
    TimerTicked(u32),
    Won(FinishedGame),
    ScoreRecorded {
        entry: crate::records::ScoreEntry,
        saved: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub player_name: String,
    pub difficulty: Difficulty,
    pub cards: Vec<CardView>,
    pub move_count: u32,
    pub match_count: u32,
    pub pair_count: u32,
    pub elapsed_seconds: u32,
    pub phase: Phase,
    pub ended: bool,
}

pub struct GameSession {
    player_name: String,
    difficulty: Difficulty,
    deck: Deck,
    selected: Vec<usize>,
    move_count: u32,
    match_count: u32,
    elapsed_seconds: u32,
    ended: bool,
    timer: Option<TaskHandle>,
    settle_task: Option<TaskHandle>,
    events: Vec<GameEvent>,
}

impl GameSession {
    pub fn new<R: Rng + ?Sized>(
        player_name: &str,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let player_name = validate_player_name(player_name)?;
        Ok(Self::build(player_name, difficulty, Deck::shuffled(difficulty, rng)))
    }

    /// Starts a session on a pre-arranged deck. The deck must hold
    /// `difficulty.pair_count()` faces, each exactly twice.
    pub fn with_deck(
        player_name: &str,
        difficulty: Difficulty,
        deck: Deck,
    ) -> Result<Self, SessionError> {
        let player_name = validate_player_name(player_name)?;
        if deck.len() != difficulty.pair_count() * 2 || !deck.is_paired() {
            return Err(SessionError::DeckMismatch {
                difficulty,
                cards: deck.len(),
            });
        }
        Ok(Self::build(player_name, difficulty, deck))
    }

    fn build(player_name: String, difficulty: Difficulty, deck: Deck) -> Self {
        debug!(player = %player_name, %difficulty, cards = deck.len(), "session started");
        GameSession {
            player_name,
            difficulty,
            deck,
            selected: Vec::with_capacity(2),
            move_count: 0,
            match_count: 0,
            elapsed_seconds: 0,
            ended: false,
            timer: None,
            settle_task: None,
            events: Vec::new(),
        }
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn phase(&self) -> Phase {
        if self.ended {
            Phase::Won
        } else if self.selected.len() == 2 {
            Phase::Resolving
        } else {
            Phase::Playing
        }
    }

    pub fn pending(&self) -> Option<PendingPair> {
        match self.selected.as_slice() {
            &[first, second] => {
                let cards = self.deck.cards();
                let resolution = if cards[first].face == cards[second].face {
                    Resolution::Match
                } else {
                    Resolution::Mismatch
                };
                Some(PendingPair {
                    first,
                    second,
                    resolution,
                })
            }
            _ => None,
        }
    }

    pub fn select(&mut self, index: usize) -> Selection {
        if self.ended {
            return Selection::Rejected(Rejection::Ended);
        }
        if self.selected.len() >= 2 {
            return Selection::Rejected(Rejection::BufferFull);
        }
        let Some(card) = self.deck.get(index) else {
            return Selection::Rejected(Rejection::OutOfRange);
        };
        match card.status {
            CardStatus::Matched => return Selection::Rejected(Rejection::AlreadyMatched),
            CardStatus::Revealed => return Selection::Rejected(Rejection::AlreadyRevealed),
            CardStatus::Hidden => {}
        }

        self.deck.set_status(index, CardStatus::Revealed);
        self.selected.push(index);
        self.events.push(GameEvent::CardRevealed { index });

        match self.pending() {
            Some(pending) => {
                self.move_count += 1;
                self.events.push(GameEvent::MovesChanged(self.move_count));
                debug!(
                    first = pending.first,
                    second = pending.second,
                    resolution = ?pending.resolution,
                    moves = self.move_count,
                    "pair revealed"
                );
                Selection::PairRevealed(pending)
            }
            None => Selection::Revealed { index },
        }
    }

    /// Applies the outcome of the buffered pair. Returns `None` when no pair
    /// is waiting.
    pub fn settle(&mut self) -> Option<Settled> {
        let pending = self.pending()?;
        self.selected.clear();
        if let Some(handle) = self.settle_task.take() {
            handle.cancel();
        }

        match pending.resolution {
            Resolution::Mismatch => {
                self.deck.set_status(pending.first, CardStatus::Hidden);
                self.deck.set_status(pending.second, CardStatus::Hidden);
                self.events.push(GameEvent::CardsHidden {
                    first: pending.first,
                    second: pending.second,
                });
                Some(Settled::Mismatched(pending))
            }
            Resolution::Match => {
                self.deck.set_status(pending.first, CardStatus::Matched);
                self.deck.set_status(pending.second, CardStatus::Matched);
                self.match_count += 1;
                self.events.push(GameEvent::CardsMatched {
                    first: pending.first,
                    second: pending.second,
                });
                self.events.push(GameEvent::MatchesChanged(self.match_count));

                if self.match_count as usize == self.deck.pair_count() {
                    let record = self.finish();
                    Some(Settled::Won(pending, record))
                } else {
                    Some(Settled::Matched(pending))
                }
            }
        }
    }

    fn finish(&mut self) -> FinishedGame {
        self.ended = true;
        self.stop_timer();
        let record = FinishedGame {
            player_name: self.player_name.clone(),
            difficulty: self.difficulty,
            elapsed_seconds: self.elapsed_seconds,
            move_count: self.move_count,
        };
        debug!(
            seconds = record.elapsed_seconds,
            moves = record.move_count,
            "session won"
        );
        self.events.push(GameEvent::Won(record.clone()));
        record
    }

    /// One timer period elapsed. Ignored once the session has ended.
    pub fn tick(&mut self) -> bool {
        if self.ended {
            return false;
        }
        self.elapsed_seconds += 1;
        self.events.push(GameEvent::TimerTicked(self.elapsed_seconds));
        true
    }

    pub fn attach_timer(&mut self, handle: TaskHandle) {
        self.stop_timer();
        if self.ended {
            handle.cancel();
        } else {
            self.timer = Some(handle);
        }
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn attach_settle_task(&mut self, handle: TaskHandle) {
        if let Some(previous) = self.settle_task.replace(handle) {
            previous.cancel();
        }
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.cancel();
        }
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            player_name: self.player_name.clone(),
            difficulty: self.difficulty,
            cards: self.deck.cards().iter().map(CardView::from).collect(),
            move_count: self.move_count,
            match_count: self.match_count,
            pair_count: self.deck.pair_count() as u32,
            elapsed_seconds: self.elapsed_seconds,
            phase: self.phase(),
            ended: self.ended,
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.stop_timer();
        if let Some(handle) = self.settle_task.take() {
            handle.cancel();
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("player_name", &self.player_name)
            .field("difficulty", &self.difficulty)
            .field("phase", &self.phase())
            .field("move_count", &self.move_count)
            .field("match_count", &self.match_count)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .finish()
    }
}
