use serde::{Deserialize, Serialize};
use std::fmt;

/// Player rarity tier, ordered from most to least valuable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Iconic,
    Legend,
    Black,
    Gold,
    Silver,
    Bronze,
    White,
}

impl Rarity {
    pub const ALL: [Rarity; 7] = [
        Rarity::Iconic,
        Rarity::Legend,
        Rarity::Black,
        Rarity::Gold,
        Rarity::Silver,
        Rarity::Bronze,
        Rarity::White,
    ];

    /// Rarities a free pack reward can be rolled from
    pub const TOP: [Rarity; 3] = [Rarity::Iconic, Rarity::Legend, Rarity::Black];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Iconic => "Iconic",
            Rarity::Legend => "Legend",
            Rarity::Black => "Black",
            Rarity::Gold => "Gold",
            Rarity::Silver => "Silver",
            Rarity::Bronze => "Bronze",
            Rarity::White => "White",
        }
    }

    /// GP paid out when a pull lands on a player the user already owns
    pub fn sell_value(&self) -> u64 {
        match self {
            Rarity::Iconic => 50_000,
            Rarity::Legend => 25_000,
            Rarity::Black => 10_000,
            Rarity::Gold => 5_000,
            Rarity::Silver => 2_500,
            Rarity::Bronze => 1_000,
            Rarity::White => 500,
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            Rarity::Iconic => 0xFF00FF,
            Rarity::Legend => 0xFFD700,
            Rarity::Black => 0x000000,
            Rarity::Gold => 0xFFC300,
            Rarity::Silver => 0xC0C0C0,
            Rarity::Bronze => 0xCD7F32,
            Rarity::White => 0xFFFFFF,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Rarity::Iconic => "💎",
            Rarity::Legend => "🌟",
            Rarity::Black => "⚫",
            Rarity::Gold => "🟡",
            Rarity::Silver => "⚪",
            Rarity::Bronze => "🟤",
            Rarity::White => "⬜",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rarity {
    type Err = crate::error::BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::error::BotError::ConfigValidation {
                message: format!("unknown rarity '{}'", s),
            })
    }
}
