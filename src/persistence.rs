use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::{
    bag::Tile,
    board::{Board, Coordinate, Orientation},
    error::StoreError,
    reporting::Winner,
    rules::Difficulty,
};

pub type GameId = u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub player_id: i64,
    pub difficulty: Difficulty,
    pub player_score: i32,
    pub ai_score: i32,
    pub winner: Option<Winner>,
    pub duration: time::Duration,
    /// A `BoardSnapshot` as JSON.
    pub board_snapshot: String,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub player_id: i64,
    pub word: String,
    pub score: u32,
    /// Placed cells, e.g. `(7,7),(7,8)`.
    pub position: String,
    pub direction: Orientation,
    pub move_number: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub game: GameRecord,
    pub moves: Vec<MoveRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games_played: u32,
    pub total_score: i64,
    pub highest_score: i32,
}

/// Where finished and in-progress games are kept.
pub trait GameStore {
    fn save_game(&mut self, record: &GameRecord) -> Result<GameId, StoreError>;

    fn update_game(&mut self, id: GameId, record: &GameRecord) -> Result<(), StoreError>;

    /// Stores a move, replacing any stored move with the same number.
    fn save_move(&mut self, id: GameId, record: &MoveRecord) -> Result<(), StoreError>;

    /// Forgets every stored move numbered above `move_number`, e.g. after a move was taken back.
    fn discard_moves_after(&mut self, id: GameId, move_number: usize) -> Result<(), StoreError>;

    /// The game and its moves in the order they were played.
    fn load_game(&self, id: GameId) -> Result<SavedGame, StoreError>;

    fn update_player_stats(
        &mut self,
        player_id: i64,
        games_played_delta: u32,
        score_delta: i32,
        highest_score: Option<i32>,
    ) -> Result<(), StoreError>;

    /// Stored games, optionally only one player's and only finished or unfinished ones.
    fn saved_games(
        &self,
        player_id: Option<i64>,
        completed: Option<bool>,
    ) -> Result<Vec<(GameId, GameRecord)>, StoreError>;

    fn player_stats(&self, player_id: i64) -> Result<Option<PlayerStats>, StoreError>;
}

/// Occupied cells keyed by `"(row,col)"`, each holding `[letter, value]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardSnapshot(pub BTreeMap<String, (char, u32)>);

impl BoardSnapshot {
    pub fn capture(board: &Board) -> Self {
        Self(
            board
                .tiles()
                .map(|(position, tile)| (position.to_string(), (tile.letter, tile.value)))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces every tile on `board` with the snapshot's. Zero-value tiles come back as blanks.
    pub fn restore(&self, board: &mut Board) -> Result<(), StoreError> {
        board.clear_tiles();
        for (key, &(letter, value)) in &self.0 {
            let position: Coordinate = key.parse()?;
            let tile = if value == 0 {
                Tile::blank().designate(letter)
            } else {
                Tile::new(letter, value)
            };
            board.place(position, tile)?;
        }
        Ok(())
    }
}

/// Keeps everything in memory. Ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: BTreeMap<GameId, SavedGame>,
    stats: HashMap<i64, PlayerStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}

impl GameStore for MemoryStore {
    fn save_game(&mut self, record: &GameRecord) -> Result<GameId, StoreError> {
        let id = self.games.keys().next_back().map_or(1, |last| last + 1);
        self.games.insert(
            id,
            SavedGame {
                game: record.clone(),
                moves: vec![],
            },
        );
        Ok(id)
    }

    fn update_game(&mut self, id: GameId, record: &GameRecord) -> Result<(), StoreError> {
        let saved = self.games.get_mut(&id).ok_or(StoreError::UnknownGame(id))?;
        saved.game = record.clone();
        Ok(())
    }

    fn save_move(&mut self, id: GameId, record: &MoveRecord) -> Result<(), StoreError> {
        let saved = self.games.get_mut(&id).ok_or(StoreError::UnknownGame(id))?;
        saved.moves.retain(|m| m.move_number != record.move_number);
        saved.moves.push(record.clone());
        saved.moves.sort_by_key(|m| m.move_number);
        Ok(())
    }

    fn discard_moves_after(&mut self, id: GameId, move_number: usize) -> Result<(), StoreError> {
        let saved = self.games.get_mut(&id).ok_or(StoreError::UnknownGame(id))?;
        saved.moves.retain(|m| m.move_number <= move_number);
        Ok(())
    }

    fn load_game(&self, id: GameId) -> Result<SavedGame, StoreError> {
        self.games.get(&id).cloned().ok_or(StoreError::UnknownGame(id))
    }

    fn update_player_stats(
        &mut self,
        player_id: i64,
        games_played_delta: u32,
        score_delta: i32,
        highest_score: Option<i32>,
    ) -> Result<(), StoreError> {
        let stats = self.stats.entry(player_id).or_default();
        stats.games_played += games_played_delta;
        stats.total_score += i64::from(score_delta);
        if let Some(score) = highest_score {
            stats.highest_score = stats.highest_score.max(score);
        }
        Ok(())
    }

    fn saved_games(
        &self,
        player_id: Option<i64>,
        completed: Option<bool>,
    ) -> Result<Vec<(GameId, GameRecord)>, StoreError> {
        Ok(self
            .games
            .iter()
            .filter(|(_, saved)| player_id.map_or(true, |id| saved.game.player_id == id))
            .filter(|(_, saved)| completed.map_or(true, |done| saved.game.completed == done))
            .map(|(id, saved)| (*id, saved.game.clone()))
            .collect())
    }

    fn player_stats(&self, player_id: i64) -> Result<Option<PlayerStats>, StoreError> {
        Ok(self.stats.get(&player_id).cloned())
    }
}
