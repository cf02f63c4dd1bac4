use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{Card, CardStatus, Difficulty};

/// Faces in catalog order; a difficulty with `n` pairs uses the first `n`.
pub const FACE_CATALOG: [&str; 8] = [
    "🍎", "🍌", "🍇", "🍒", "🍓", "🥝", "🍍", "🍉",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn shuffled<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Self {
        let pair_count = difficulty.pair_count();
        let mut faces = Vec::with_capacity(pair_count * 2);
        for &face in FACE_CATALOG.iter().take(pair_count) {
            faces.push(face);
            faces.push(face);
        }
        faces.shuffle(rng);
        Self::from_faces(faces)
    }

    /// Builds a deck in the given order, all cards hidden.
    pub fn from_faces<I>(faces: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Deck {
            cards: faces.into_iter().map(Card::hidden).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub(super) fn set_status(&mut self, index: usize, status: CardStatus) {
        if let Some(card) = self.cards.get_mut(index) {
            card.status = status;
        }
    }

    /// Every face appears exactly twice.
    pub fn is_paired(&self) -> bool {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for card in &self.cards {
            *counts.entry(card.face).or_insert(0) += 1;
        }
        counts.values().all(|&n| n == 2)
    }

    pub fn all_matched(&self) -> bool {
        self.cards.iter().all(|card| card.status == CardStatus::Matched)
    }
}
