use crate::bag::Tile;
use crate::board::{Board, Coordinate, Orientation};
use crate::moves::{FormedWord, Placement, PlacementCommand};
use crate::rules::GameRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCalculator {
    bingo_bonus: u32,
    bingo_tiles: usize,
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::from_rules(&GameRules::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementEvaluation {
    pub valid: bool,
    pub score: u32,
    pub words: Vec<FormedWord>,
    /// Rack tiles consumed, as they sat on the rack.
    pub tiles_used: Vec<Tile>,
    /// The new tiles and where they go, blanks designated.
    pub placements: Vec<Placement>,
}

impl PlacementEvaluation {
    fn invalid() -> Self {
        Self::default()
    }
}

impl ScoreCalculator {
    pub fn from_rules(rules: &GameRules) -> Self {
        Self {
            bingo_bonus: rules.bingo_bonus,
            bingo_tiles: rules.rack_size,
        }
    }

    pub fn bingo_bonus(&self) -> u32 {
        self.bingo_bonus
    }

    /// The flat bonus a move earns for the number of rack tiles it used.
    pub fn bingo_for(&self, tiles_used: usize) -> u32 {
        if tiles_used == self.bingo_tiles {
            self.bingo_bonus
        } else {
            0
        }
    }

    /// Scores one word as it sits on `board`.
    /// Letter bonuses multiply the tile under them, word bonuses multiply the total and compound.
    pub fn score_word(&self, word: &FormedWord, board: &Board) -> u32 {
        let mut letters = 0;
        let mut multiplier = 1;
        for position in &word.positions {
            let bonus = board.bonus(*position).unwrap_or_default();
            let value = board.get(*position).map(|t| t.value).unwrap_or(0);
            letters += value * bonus.letter_multiplier();
            multiplier *= bonus.word_multiplier();
        }
        letters * multiplier
    }

    /// Sum of every word. The bingo bonus is left to the caller.
    pub fn score_move(&self, words: &[FormedWord], board: &Board) -> u32 {
        words.iter().map(|w| self.score_word(w, board)).sum()
    }

    /// Plays `word` onto the board from `start` using tiles from `rack`, scores it, and puts the board back.
    /// Letters already on the board are reused when they match and rejected when they don't.
    pub fn evaluate_placement(
        &self,
        word: &str,
        start: Coordinate,
        orientation: Orientation,
        rack: &[Tile],
        board: &mut Board,
    ) -> PlacementEvaluation {
        let mut used_indices: Vec<usize> = vec![];
        let mut placements = vec![];

        for (offset, letter) in word.chars().enumerate() {
            let letter = letter.to_ascii_uppercase();
            let position = start.step(orientation, offset);
            if !board.in_bounds(position) {
                return PlacementEvaluation::invalid();
            }

            match board.get(position) {
                Some(existing) if existing.letter == letter => continue,
                Some(_) => return PlacementEvaluation::invalid(),
                None => {}
            }

            let Some(index) = find_rack_tile(rack, letter, &used_indices) else {
                return PlacementEvaluation::invalid();
            };
            used_indices.push(index);
            let tile = rack[index];
            let placed = if tile.blank { tile.designate(letter) } else { tile };
            placements.push((position, placed));
        }

        if placements.is_empty() {
            return PlacementEvaluation::invalid();
        }

        let command = PlacementCommand::place(&placements);
        if command.apply(board).is_err() {
            return PlacementEvaluation::invalid();
        }
        let words = board.words_formed(&placements);
        let score = self.score_move(&words, board) + self.bingo_for(placements.len());
        command.revert(board);

        PlacementEvaluation {
            valid: true,
            score,
            words,
            tiles_used: used_indices.iter().map(|&i| rack[i]).collect(),
            placements,
        }
    }
}

fn find_rack_tile(rack: &[Tile], letter: char, used: &[usize]) -> Option<usize> {
    let free = |i: &usize| !used.contains(i);
    (0..rack.len())
        .filter(free)
        .find(|&i| !rack[i].blank && rack[i].letter == letter)
        .or_else(|| (0..rack.len()).filter(free).find(|&i| rack[i].blank))
}
