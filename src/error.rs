use super::board::Coordinate;
use crate::persistence::GameId;
use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq)]
pub enum GamePlayError {
    #[error("Coordinate {position} is not within board dimensions")]
    OutSideBoardDimensions { position: Coordinate },
    #[error("Cannot place a tile in the occupied square {position}")]
    OccupiedPlace { position: Coordinate },
    #[error("There is no tile at {position}")]
    EmptySquare { position: Coordinate },
    #[error("The tile at {position} was not placed this turn")]
    NotPendingPlacement { position: Coordinate },

    #[error("It is not the player's turn")]
    NotYourTurn,
    #[error("The game is over")]
    GameOver,

    #[error("Rack doesn't have a '{tile}' tile")]
    TileNotInRack { tile: char },
    #[error("Blank tiles must be given a letter when placed")]
    UndesignatedBlank,

    #[error("No tiles have been placed this turn")]
    NoPendingPlacement,
    #[error("Tiles must be placed in a single row or column")]
    NonLinearPlacement,
    #[error("Tiles must form one unbroken line")]
    GapInPlacement,
    #[error("The first word must cover the centre square")]
    FirstMoveMissesCenter,
    #[error("Tiles must connect to a word already on the board")]
    DisconnectedPlacement,
    #[error("A move must form a word of at least two letters")]
    NoWordFormed,
    #[error("Invalid word(s): {}", .words.join(", "))]
    InvalidWords { words: Vec<String> },

    #[error("There is no move open to challenge")]
    ChallengeClosed,
    #[error("The word {word} was not part of the last move")]
    NotChallengeable { word: String },

    #[error("Cannot exchange {requested} tiles with only {remaining} left in the bag")]
    BagTooSmall { requested: usize, remaining: usize },
    #[error("At least one tile must be exchanged")]
    EmptyExchange,

    #[error("{0:?} is not a coordinate")]
    InvalidCoordinate(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Game {0} does not exist")]
    UnknownGame(GameId),
    #[error("Board snapshot couldn't be read: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("Board snapshot is inconsistent: {0}")]
    Restore(#[from] GamePlayError),
}
