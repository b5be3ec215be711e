use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// How many plies the hard search looks ahead.
    pub fn search_depth(self) -> usize {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// How many candidate moves survive generation.
    pub fn max_candidates(self) -> usize {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 5,
            Difficulty::Hard => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileDistribution {
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusLayout {
    Standard,
    Randomized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    pub board_size: usize,
    pub rack_size: usize,
    pub bingo_bonus: u32,
    pub pass_limit: usize,
    pub challenge_penalty: u32,
    pub challenge_seconds: u32,
    pub tile_distribution: TileDistribution,
    pub bonus_layout: BonusLayout,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            board_size: 15,
            rack_size: 7,
            bingo_bonus: 50,
            pass_limit: 6,
            challenge_penalty: 10,
            challenge_seconds: 30,
            tile_distribution: TileDistribution::Standard,
            bonus_layout: BonusLayout::Standard,
        }
    }
}

/// Everything a game session needs to know up front, handed to the controller on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    /// Restricts valid words to one dictionary theme when set.
    pub theme: Option<String>,
    pub rules: GameRules,
    /// Fixes the tile bag and AI randomness for reproducible games.
    pub tile_seed: Option<u64>,
}
