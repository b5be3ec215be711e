use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::bag::Tile;
use crate::error::GamePlayError;
use crate::moves::{FormedWord, Placement};

pub const STANDARD_SIZE: usize = 15;

const TRIPLE_WORD: [(usize, usize); 8] = [
    (0, 0),
    (0, 7),
    (0, 14),
    (7, 0),
    (7, 14),
    (14, 0),
    (14, 7),
    (14, 14),
];

const DOUBLE_WORD: [(usize, usize); 17] = [
    (1, 1),
    (2, 2),
    (3, 3),
    (4, 4),
    (1, 13),
    (2, 12),
    (3, 11),
    (4, 10),
    (10, 4),
    (11, 3),
    (12, 2),
    (13, 1),
    (10, 10),
    (11, 11),
    (12, 12),
    (13, 13),
    (7, 7),
];

const TRIPLE_LETTER: [(usize, usize); 12] = [
    (1, 5),
    (1, 9),
    (5, 1),
    (5, 5),
    (5, 9),
    (5, 13),
    (9, 1),
    (9, 5),
    (9, 9),
    (9, 13),
    (13, 5),
    (13, 9),
];

const DOUBLE_LETTER: [(usize, usize); 24] = [
    (0, 3),
    (0, 11),
    (2, 6),
    (2, 8),
    (3, 0),
    (3, 7),
    (3, 14),
    (6, 2),
    (6, 6),
    (6, 8),
    (6, 12),
    (7, 3),
    (7, 11),
    (8, 2),
    (8, 6),
    (8, 8),
    (8, 12),
    (11, 0),
    (11, 7),
    (11, 14),
    (12, 6),
    (12, 8),
    (14, 3),
    (14, 11),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn opposite(self) -> Self {
        use Direction::*;

        match self {
            North => South,
            East => West,
            South => North,
            West => East,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// The direction words are read in.
    pub fn forward(self) -> Direction {
        match self {
            Orientation::Horizontal => Direction::East,
            Orientation::Vertical => Direction::South,
        }
    }

    pub fn perpendicular(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
}

impl Coordinate {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn add(self, direction: Direction) -> Coordinate {
        use Direction::*;

        Coordinate {
            row: match direction {
                North => usize::wrapping_sub(self.row, 1),
                South => self.row + 1,
                East | West => self.row,
            },
            col: match direction {
                West => usize::wrapping_sub(self.col, 1),
                East => self.col + 1,
                North | South => self.col,
            },
        }
    }

    /// Moves `steps` cells along the orientation.
    pub fn step(self, orientation: Orientation, steps: usize) -> Coordinate {
        match orientation {
            Orientation::Horizontal => Coordinate::new(self.row, self.col + steps),
            Orientation::Vertical => Coordinate::new(self.row + steps, self.col),
        }
    }

    /// Return coordinates of the horizontal and vertical neighbors, from north clockwise
    pub fn neighbors_4(&self) -> [Coordinate; 4] {
        use Direction::*;

        [
            self.add(North),
            self.add(East),
            self.add(South),
            self.add(West),
        ]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

impl FromStr for Coordinate {
    type Err = GamePlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GamePlayError::InvalidCoordinate(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let (row, col) = inner.split_once(',').ok_or_else(invalid)?;
        Ok(Coordinate {
            row: row.trim().parse().map_err(|_| invalid())?,
            col: col.trim().parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, Display,
)]
pub enum Bonus {
    #[default]
    Normal,
    DoubleLetter,
    TripleLetter,
    DoubleWord,
    TripleWord,
}

impl Bonus {
    pub fn letter_multiplier(self) -> u32 {
        match self {
            Bonus::DoubleLetter => 2,
            Bonus::TripleLetter => 3,
            _ => 1,
        }
    }

    pub fn word_multiplier(self) -> u32 {
        match self {
            Bonus::DoubleWord => 2,
            Bonus::TripleWord => 3,
            _ => 1,
        }
    }

    pub fn is_word_bonus(self) -> bool {
        matches!(self, Bonus::DoubleWord | Bonus::TripleWord)
    }

    pub fn is_letter_bonus(self) -> bool {
        matches!(self, Bonus::DoubleLetter | Bonus::TripleLetter)
    }

    fn token(self) -> &'static str {
        match self {
            Bonus::Normal => "__",
            Bonus::DoubleLetter => "dl",
            Bonus::TripleLetter => "tl",
            Bonus::DoubleWord => "dw",
            Bonus::TripleWord => "tw",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Bonus::iter().find(|b| b.token() == token)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    squares: Vec<Vec<Option<Tile>>>,
    bonuses: Vec<Vec<Bonus>>,
}

impl Board {
    /// An empty board. The standard size gets the standard bonus layout,
    /// other sizes only carry the double word centre.
    pub fn new(size: usize) -> Self {
        let mut bonuses = vec![vec![Bonus::Normal; size]; size];

        if size == STANDARD_SIZE {
            let layout = [
                (Bonus::TripleWord, &TRIPLE_WORD[..]),
                (Bonus::DoubleWord, &DOUBLE_WORD[..]),
                (Bonus::TripleLetter, &TRIPLE_LETTER[..]),
                (Bonus::DoubleLetter, &DOUBLE_LETTER[..]),
            ];
            for (bonus, cells) in layout {
                for &(row, col) in cells {
                    bonuses[row][col] = bonus;
                }
            }
        } else if size > 0 {
            bonuses[size / 2][size / 2] = Bonus::DoubleWord;
        }

        Board {
            size,
            squares: vec![vec![None; size]; size],
            bonuses,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.size / 2, self.size / 2)
    }

    pub fn in_bounds(&self, position: Coordinate) -> bool {
        position.row < self.size && position.col < self.size
    }

    pub fn get(&self, position: Coordinate) -> Option<Tile> {
        self.squares
            .get(position.row)
            .and_then(|row| row.get(position.col))
            .copied()
            .flatten()
    }

    pub fn occupied(&self, position: Coordinate) -> bool {
        self.get(position).is_some()
    }

    pub fn bonus(&self, position: Coordinate) -> Option<Bonus> {
        self.bonuses
            .get(position.row)
            .and_then(|row| row.get(position.col))
            .copied()
    }

    pub fn place(&mut self, position: Coordinate, tile: Tile) -> Result<(), GamePlayError> {
        if !self.in_bounds(position) {
            return Err(GamePlayError::OutSideBoardDimensions { position });
        }
        if self.occupied(position) {
            return Err(GamePlayError::OccupiedPlace { position });
        }
        self.squares[position.row][position.col] = Some(tile);
        Ok(())
    }

    pub fn remove(&mut self, position: Coordinate) -> Result<Tile, GamePlayError> {
        if !self.in_bounds(position) {
            return Err(GamePlayError::OutSideBoardDimensions { position });
        }
        self.squares[position.row][position.col]
            .take()
            .ok_or(GamePlayError::EmptySquare { position })
    }

    /// Unchecked write used by reversible commands, which validate before writing.
    pub(crate) fn set_cell(&mut self, position: Coordinate, tile: Option<Tile>) {
        self.squares[position.row][position.col] = tile;
    }

    pub fn is_empty(&self) -> bool {
        self.squares.iter().flatten().all(Option::is_none)
    }

    pub fn tile_count(&self) -> usize {
        self.squares.iter().flatten().filter(|s| s.is_some()).count()
    }

    pub fn clear_tiles(&mut self) {
        for square in self.squares.iter_mut().flatten() {
            *square = None;
        }
    }

    /// Every occupied cell with its tile, in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (Coordinate, Tile)> + '_ {
        self.squares.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(col, tile)| tile.map(|t| (Coordinate::new(row, col), t)))
        })
    }

    pub fn neighbouring_squares(&self, position: Coordinate) -> Vec<(Coordinate, Option<Tile>)> {
        position
            .neighbors_4()
            .into_iter()
            .filter(|n| self.in_bounds(*n))
            .map(|n| (n, self.get(n)))
            .collect()
    }

    pub fn touches_tile(&self, position: Coordinate) -> bool {
        self.neighbouring_squares(position)
            .iter()
            .any(|(_, tile)| tile.is_some())
    }

    /// Empty cells next to at least one placed tile, where new words can hook on.
    pub fn anchors(&self) -> Vec<Coordinate> {
        (0..self.size)
            .flat_map(|row| (0..self.size).map(move |col| Coordinate::new(row, col)))
            .filter(|c| !self.occupied(*c) && self.touches_tile(*c))
            .collect()
    }

    /// Every word a set of new placements would form, read as if the placements were already on the board.
    /// The board itself is left untouched.
    pub fn words_formed(&self, placements: &[Placement]) -> Vec<FormedWord> {
        let placements: Vec<_> = placements
            .iter()
            .filter(|(position, _)| self.in_bounds(*position))
            .collect();
        let Some((first, _)) = placements.first() else {
            return vec![];
        };

        let tile_at = |position: Coordinate| -> Option<Tile> {
            placements
                .iter()
                .find(|(p, _)| *p == position)
                .map(|(_, t)| *t)
                .or_else(|| self.get(position))
        };

        // A lone tile reads horizontally first, then its vertical run turns up as the cross word.
        let main = if placements.iter().all(|(p, _)| p.row == first.row) {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };

        let mut words: Vec<FormedWord> = vec![];
        for (position, _) in &placements {
            for orientation in [main, main.perpendicular()] {
                let run = self.run_through(*position, orientation, &tile_at);
                if run.positions.len() > 1 && !words.contains(&run) {
                    words.push(run);
                }
            }
        }
        words
    }

    fn run_through<F>(&self, seed: Coordinate, orientation: Orientation, tile_at: &F) -> FormedWord
    where
        F: Fn(Coordinate) -> Option<Tile>,
    {
        let forward = orientation.forward();
        let backward = forward.opposite();

        let mut start = seed;
        loop {
            let previous = start.add(backward);
            if !self.in_bounds(previous) || tile_at(previous).is_none() {
                break;
            }
            start = previous;
        }

        let mut word = String::new();
        let mut positions = vec![];
        let mut cursor = start;
        while self.in_bounds(cursor) {
            let Some(tile) = tile_at(cursor) else {
                break;
            };
            word.push(tile.letter);
            positions.push(cursor);
            cursor = cursor.add(forward);
        }

        FormedWord { word, positions }
    }

    pub fn bonus_counts(&self) -> BTreeMap<Bonus, usize> {
        let mut counts = BTreeMap::new();
        for bonus in self.bonuses.iter().flatten() {
            *counts.entry(*bonus).or_insert(0) += 1;
        }
        counts
    }

    /// Scatters the premium cells while keeping how many of each there are.
    /// The centre always stays a double word.
    pub fn randomize_bonuses<R: Rng>(&mut self, rng: &mut R) {
        let mut counts = self.bonus_counts();
        counts.remove(&Bonus::Normal);

        self.bonuses = vec![vec![Bonus::Normal; self.size]; self.size];
        if self.size == 0 {
            return;
        }
        let center = self.center();
        self.bonuses[center.row][center.col] = Bonus::DoubleWord;
        if let Some(dw) = counts.get_mut(&Bonus::DoubleWord) {
            *dw = dw.saturating_sub(1);
        }

        let mut free: Vec<Coordinate> = (0..self.size)
            .flat_map(|row| (0..self.size).map(move |col| Coordinate::new(row, col)))
            .filter(|c| *c != center)
            .collect();
        free.shuffle(rng);

        let mut cells = free.into_iter();
        for (bonus, count) in counts {
            for cell in cells.by_ref().take(count) {
                self.bonuses[cell.row][cell.col] = bonus;
            }
        }
    }

    /// Builds a board from its `Display` form. Letter tokens take standard values.
    pub fn from_string<S: AsRef<str>>(s: S) -> Board {
        let rows: Vec<Vec<&str>> = s
            .as_ref()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().collect())
            .collect();
        let size = rows.len();

        let mut board = Board {
            size,
            squares: vec![vec![None; size]; size],
            bonuses: vec![vec![Bonus::Normal; size]; size],
        };
        for (row, tokens) in rows.into_iter().enumerate() {
            assert_eq!(tokens.len(), size, "Board must be square");
            for (col, token) in tokens.into_iter().enumerate() {
                if let Some(bonus) = Bonus::from_token(token) {
                    board.bonuses[row][col] = bonus;
                    continue;
                }
                let mut chars = token.chars();
                let letter = chars.next().expect("Square needs a letter");
                let tile = match chars.next() {
                    Some('?') => Tile::blank().designate(letter),
                    _ => Tile::standard(letter),
                };
                board.squares[row][col] = Some(tile);
            }
        }
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(STANDARD_SIZE)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.squares
                .iter()
                .zip(&self.bonuses)
                .map(|(row, bonuses)| {
                    row.iter()
                        .zip(bonuses)
                        .map(|(square, bonus)| match square {
                            Some(tile) if tile.blank => format!("{}?", tile.letter),
                            Some(tile) => format!("{}.", tile.letter),
                            None => bonus.token().to_string(),
                        })
                        .collect::<Vec<String>>()
                        .join(" ")
                })
                .collect::<Vec<String>>()
                .join("\n")
        )
    }
}
