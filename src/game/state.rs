use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored codes are read through [`Difficulty::from_code`], so an unknown or
/// differently cased code loads as `Easy` instead of failing the whole record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn pair_count(self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Medium => 6,
            Difficulty::Hard => 8,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Unknown codes fall back to `Easy`; this never fails.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Easy,
        }
    }
}

impl From<String> for Difficulty {
    fn from(code: String) -> Self {
        Difficulty::from_code(&code)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Hidden,
    Revealed,
    Matched,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub face: &'static str,
    pub status: CardStatus,
}

impl Card {
    pub fn hidden(face: &'static str) -> Self {
        Card {
            face,
            status: CardStatus::Hidden,
        }
    }
}

/// Read-only view of one board position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub face: &'static str,
    pub status: CardStatus,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        CardView {
            face: card.face,
            status: card.status,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Playing,
    Resolving,
    Won,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_counts_follow_difficulty() {
        assert_eq!(Difficulty::Easy.pair_count(), 4);
        assert_eq!(Difficulty::Medium.pair_count(), 6);
        assert_eq!(Difficulty::Hard.pair_count(), 8);
    }

    #[test]
    fn unknown_codes_fall_back_to_easy() {
        assert_eq!(Difficulty::from_code("hard"), Difficulty::Hard);
        assert_eq!(Difficulty::from_code(" Medium "), Difficulty::Medium);
        assert_eq!(Difficulty::from_code("impossible"), Difficulty::Easy);
        assert_eq!(Difficulty::from_code(""), Difficulty::Easy);
        assert_eq!(Difficulty::from_code("impossible").pair_count(), 4);
    }

    #[test]
    fn stored_codes_decode_leniently() {
        let decode = |raw: &str| serde_json::from_str::<Difficulty>(raw).unwrap();
        assert_eq!(decode(r#""hard""#), Difficulty::Hard);
        assert_eq!(decode(r#""Medium""#), Difficulty::Medium);
        assert_eq!(decode(r#""nightmare""#), Difficulty::Easy);
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), r#""hard""#);
    }

    #[test]
    fn codes_round_trip() {
        for difficulty in Difficulty::ALL {
            assert_eq!(Difficulty::from_code(difficulty.code()), difficulty);
        }
    }
}
