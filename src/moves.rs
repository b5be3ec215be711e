use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bag::Tile;
use crate::board::{Board, Coordinate, Orientation};
use crate::error::GamePlayError;
use crate::player::Rack;

/// A tile going onto an empty cell.
pub type Placement = (Coordinate, Tile);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormedWord {
    pub word: String,
    pub positions: Vec<Coordinate>,
}

impl fmt::Display for FormedWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.positions.first() {
            Some(start) => write!(f, "{} at {}", self.word, start),
            None => write!(f, "{}", self.word),
        }
    }
}

/// A candidate or committed play. `placements` only lists cells that were empty beforehand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub word: String,
    pub start: Coordinate,
    pub orientation: Orientation,
    pub placements: Vec<Placement>,
    pub words: Vec<FormedWord>,
    pub score: u32,
}

impl Move {
    pub fn tiles_used(&self) -> usize {
        self.placements.len()
    }

    pub fn positions(&self) -> Vec<Coordinate> {
        self.placements.iter().map(|(p, _)| *p).collect()
    }

    /// The tiles as they sat on the rack, with blanks undesignated.
    pub fn rack_tiles(&self) -> Vec<Tile> {
        self.placements.iter().map(|(_, t)| t.undesignated()).collect()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Play {} at {} {} for {} points",
            self.word,
            self.start,
            self.orientation.to_string().to_lowercase(),
            self.score
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CellWrite {
    position: Coordinate,
    before: Option<Tile>,
    after: Option<Tile>,
}

/// A reversible batch of cell writes.
/// `apply` checks every cell still holds its `before` value, so a command can't clobber tiles it didn't expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementCommand {
    writes: Vec<CellWrite>,
}

impl PlacementCommand {
    pub fn place(placements: &[Placement]) -> Self {
        Self {
            writes: placements
                .iter()
                .map(|&(position, tile)| CellWrite {
                    position,
                    before: None,
                    after: Some(tile),
                })
                .collect(),
        }
    }

    pub fn apply(&self, board: &mut Board) -> Result<(), GamePlayError> {
        for write in &self.writes {
            let position = write.position;
            if !board.in_bounds(position) {
                return Err(GamePlayError::OutSideBoardDimensions { position });
            }
            if board.get(position) != write.before {
                return Err(match write.before {
                    None => GamePlayError::OccupiedPlace { position },
                    Some(_) => GamePlayError::EmptySquare { position },
                });
            }
        }
        for write in &self.writes {
            board.set_cell(write.position, write.after);
        }
        Ok(())
    }

    pub fn revert(&self, board: &mut Board) {
        for write in self.writes.iter().rev() {
            board.set_cell(write.position, write.before);
        }
    }

    /// The inverse command.
    pub fn inverse(&self) -> Self {
        Self {
            writes: self
                .writes
                .iter()
                .rev()
                .map(|w| CellWrite {
                    position: w.position,
                    before: w.after,
                    after: w.before,
                })
                .collect(),
        }
    }
}

/// A move played speculatively onto a board and rack, undone with `rollback`.
#[derive(Debug)]
pub struct MoveTransaction {
    command: PlacementCommand,
    taken: Vec<Tile>,
}

impl MoveTransaction {
    pub fn begin(board: &mut Board, rack: &mut Rack, mv: &Move) -> Result<Self, GamePlayError> {
        let mut taken = Vec::with_capacity(mv.placements.len());
        for (_, tile) in &mv.placements {
            match rack.take(tile) {
                Some(t) => taken.push(t),
                None => {
                    rack.extend(taken);
                    return Err(GamePlayError::TileNotInRack { tile: tile.letter });
                }
            }
        }

        let command = PlacementCommand::place(&mv.placements);
        if let Err(e) = command.apply(board) {
            rack.extend(taken);
            return Err(e);
        }
        Ok(Self { command, taken })
    }

    pub fn rollback(self, board: &mut Board, rack: &mut Rack) {
        self.command.revert(board);
        rack.extend(self.taken);
    }

    /// Keeps the move, handing back the command that would undo its board writes.
    pub fn commit(self) -> PlacementCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(row: usize, col: usize) -> Coordinate {
        Coordinate::new(row, col)
    }

    fn cat_move() -> Move {
        Move {
            word: "CAT".into(),
            start: c(7, 7),
            orientation: Orientation::Horizontal,
            placements: vec![
                (c(7, 7), Tile::standard('C')),
                (c(7, 8), Tile::blank().designate('A')),
                (c(7, 9), Tile::standard('T')),
            ],
            words: vec![],
            score: 8,
        }
    }

    #[test]
    fn commands_apply_and_revert() {
        let mut board = Board::default();
        let command = PlacementCommand::place(&cat_move().placements);

        command.apply(&mut board).unwrap();
        assert_eq!(board.tile_count(), 3);
        assert_eq!(
            command.apply(&mut board),
            Err(GamePlayError::OccupiedPlace { position: c(7, 7) })
        );

        command.revert(&mut board);
        assert_eq!(board, Board::default());
    }

    #[test]
    fn inverse_takes_tiles_back_off() {
        let mut board = Board::default();
        board.place(c(6, 7), Tile::standard('S')).unwrap();
        let before = board.clone();

        let command = PlacementCommand::place(&cat_move().placements);
        command.apply(&mut board).unwrap();
        let undo = command.inverse();
        undo.apply(&mut board).unwrap();
        assert_eq!(board, before);

        assert_eq!(
            undo.apply(&mut board),
            Err(GamePlayError::EmptySquare { position: c(7, 9) })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn failed_command_writes_nothing() {
        let mut board = Board::default();
        board.place(c(7, 9), Tile::standard('S')).unwrap();
        let before = board.clone();

        let command = PlacementCommand::place(&cat_move().placements);
        assert!(command.apply(&mut board).is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn transactions_round_trip() {
        let mut board = Board::default();
        let mut rack = Rack::with_tiles(vec![
            Tile::standard('T'),
            Tile::blank(),
            Tile::standard('C'),
            Tile::standard('E'),
        ]);
        let original_rack = rack.clone();

        let transaction = MoveTransaction::begin(&mut board, &mut rack, &cat_move()).unwrap();
        assert_eq!(rack.tiles(), &[Tile::standard('E')]);
        assert_eq!(board.tile_count(), 3);

        transaction.rollback(&mut board, &mut rack);
        assert!(board.is_empty());
        assert!(rack.same_tiles(&original_rack));
    }

    #[test]
    fn transactions_need_the_tiles() {
        let mut board = Board::default();
        let mut rack = Rack::with_tiles(vec![Tile::standard('C'), Tile::standard('A')]);

        assert_eq!(
            MoveTransaction::begin(&mut board, &mut rack, &cat_move()).unwrap_err(),
            GamePlayError::TileNotInRack { tile: 'A' }
        );
        assert_eq!(rack.len(), 2);
        assert!(board.is_empty());
    }

    #[test]
    fn describes_moves() {
        assert_eq!(
            cat_move().to_string(),
            "Play CAT at (7,7) horizontal for 8 points"
        );
        assert_eq!(
            cat_move().rack_tiles(),
            vec![Tile::standard('C'), Tile::blank(), Tile::standard('T')]
        );
    }
}
