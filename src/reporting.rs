use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    bag::Tile,
    board::Coordinate,
    game::{Phase, Seat},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardChangeAction {
    Added,
    Removed,
}

impl fmt::Display for BoardChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoardChangeAction::Added => write!(f, "added"),
            BoardChangeAction::Removed => write!(f, "removed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardChange {
    pub coordinate: Coordinate,
    pub tile: Tile,
    pub action: BoardChangeAction,
}

impl fmt::Display for BoardChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "The tile {} at {} was {}",
            self.tile, self.coordinate, self.action
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackChange {
    pub seat: Seat,
    pub removed: Vec<char>,
    pub added: Vec<char>,
}

impl fmt::Display for RackChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} used tiles {} and gained tiles {}",
            self.seat,
            self.removed.iter().collect::<String>(),
            self.added.iter().collect::<String>()
        )
    }
}

/// Reply to a turn action, for the presentation layer to show.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub success: bool,
    pub message: String,
    pub score: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeOutcome {
    /// The word was invalid and the move was taken back.
    Upheld { word: String, points_removed: u32 },
    /// The word stood and the challenger paid the penalty.
    Rejected { word: String, penalty: u32 },
    /// Nobody challenged before the window closed.
    Expired,
}

impl fmt::Display for ChallengeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChallengeOutcome::Upheld {
                word,
                points_removed,
            } => write!(
                f,
                "Challenge successful, {word} is not a word. {points_removed} points removed."
            ),
            ChallengeOutcome::Rejected { word, penalty } => write!(
                f,
                "Challenge failed, {word} is valid. {penalty} point penalty."
            ),
            ChallengeOutcome::Expired => write!(f, "Challenge window closed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Seat(Seat),
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Winner::Seat(seat) => write!(f, "{seat}"),
            Winner::Tie => write!(f, "Tie"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverReport {
    pub winner: Winner,
    pub player_score: i32,
    pub ai_score: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    Board(BoardChange),
    Rack(RackChange),
    Score { seat: Seat, score: i32 },
    Challenge(ChallengeOutcome),
    GameOver(GameOverReport),
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Change::Board(change) => write!(f, "{change}"),
            Change::Rack(change) => write!(f, "{change}"),
            Change::Score { seat, score } => write!(f, "{seat} now has {score} points"),
            Change::Challenge(outcome) => write!(f, "{outcome}"),
            Change::GameOver(report) => write!(
                f,
                "Game over, winner: {} ({} - {})",
                report.winner, report.player_score, report.ai_score
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub seat: Seat,
    pub word: String,
    pub score: u32,
}

/// Everything a status bar needs, pulled whenever the presentation layer likes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub phase: Phase,
    pub player_score: i32,
    pub ai_score: i32,
    pub turn: Seat,
    pub turn_number: usize,
    pub tiles_remaining: usize,
    pub elapsed: time::Duration,
    pub last_move: Option<LastMove>,
    /// Seconds left to challenge the last move, if it can still be challenged.
    pub challenge_remaining: Option<u32>,
}

impl fmt::Display for GameInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Turn {} ({}) | Player {} - AI {} | {} tiles left",
            self.turn_number, self.turn, self.player_score, self.ai_score, self.tiles_remaining
        )?;
        if let Some(last) = &self.last_move {
            write!(f, " | {} played {} for {}", last.seat, last.word, last.score)?;
        }
        if let Some(seconds) = self.challenge_remaining {
            write!(f, " | {seconds}s to challenge")?;
        }
        Ok(())
    }
}
