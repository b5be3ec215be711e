use serde::{Deserialize, Serialize};
use std::fmt;
use time::Duration;
use tracing::{info, warn};

use crate::bag::{Tile, TileBag};
use crate::board::{Board, Coordinate, Orientation};
use crate::error::{GamePlayError, StoreError};
use crate::judge::Dictionary;
use crate::moves::{FormedWord, Move, MoveTransaction, Placement, PlacementCommand};
use crate::npc::{AiPlayer, SearchContext};
use crate::persistence::{BoardSnapshot, GameId, GameRecord, GameStore, MoveRecord};
use crate::reporting::{
    BoardChange, BoardChangeAction, Change, ChallengeOutcome, GameInfo, GameOverReport, LastMove,
    MoveResult, RackChange, Winner,
};
use crate::player::{Player, AI_PLAYER_ID};
use crate::rules::{BonusLayout, GameConfig};
use crate::scoring::ScoreCalculator;

fn now() -> u64 {
    instant::SystemTime::now()
        .duration_since(instant::SystemTime::UNIX_EPOCH)
        .expect("Please don't play before 1970")
        .as_secs()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    Player,
    Ai,
}

impl Seat {
    pub fn opponent(self) -> Self {
        match self {
            Seat::Player => Seat::Ai,
            Seat::Ai => Seat::Player,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Seat::Player => write!(f, "Player"),
            Seat::Ai => write!(f, "AI"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingPlayerPlacement,
    AwaitingPlayerSubmit,
    AiThinking,
    ChallengeWindow,
    GameOver,
}

/// The last committed move, kept so a challenge can take it back.
#[derive(Debug, Clone)]
struct CommittedMove {
    seat: Seat,
    mv: Move,
    command: PlacementCommand,
    /// Tiles drawn to refill the rack afterwards.
    drawn: Vec<Tile>,
}

pub struct GameController {
    config: GameConfig,
    board: Board,
    bag: TileBag,
    player: Player,
    ai_player: Player,
    player_score: i32,
    ai_score: i32,
    dictionary: Box<dyn Dictionary>,
    scorer: ScoreCalculator,
    ai: AiPlayer,
    turn: Seat,
    turn_number: usize,
    pass_count: usize,
    pending: Vec<Placement>,
    last_move: Option<CommittedMove>,
    challenge_remaining: Option<u32>,
    winner: Option<Winner>,
    started_at: u64,
    elapsed_before: Duration,
    recent_changes: Vec<Change>,
    move_log: Vec<MoveRecord>,
    game_id: Option<GameId>,
    saved_moves: usize,
    stats_recorded: bool,
}

impl GameController {
    pub fn new(player: Player, dictionary: Box<dyn Dictionary>, config: GameConfig) -> Self {
        let rules = &config.rules;
        let mut controller = Self {
            board: Board::new(rules.board_size),
            bag: TileBag::new(&rules.tile_distribution, config.tile_seed),
            player: Player::human(player.id, player.name, rules.rack_size),
            ai_player: Player::ai(rules.rack_size),
            player_score: 0,
            ai_score: 0,
            dictionary,
            scorer: ScoreCalculator::from_rules(rules),
            ai: AiPlayer::new(config.difficulty, config.tile_seed),
            turn: Seat::Player,
            turn_number: 1,
            pass_count: 0,
            pending: vec![],
            last_move: None,
            challenge_remaining: None,
            winner: None,
            started_at: now(),
            elapsed_before: Duration::ZERO,
            recent_changes: vec![],
            move_log: vec![],
            game_id: None,
            saved_moves: 0,
            stats_recorded: false,
            config,
        };
        controller.initialize();
        controller
    }

    /// Starts a fresh game: empty board, full bag, seven tiles each, human to move.
    pub fn initialize(&mut self) {
        let rules = &self.config.rules;
        self.board = Board::new(rules.board_size);
        self.bag = TileBag::new(&rules.tile_distribution, self.config.tile_seed);
        if rules.bonus_layout == BonusLayout::Randomized {
            let mut rng = crate::bag::seeded_rng(self.config.tile_seed);
            self.board.randomize_bonuses(&mut rng);
        }

        self.player.rack.drain();
        self.ai_player.rack.drain();
        self.player.rack.refill(&mut self.bag);
        self.ai_player.rack.refill(&mut self.bag);

        self.player_score = 0;
        self.ai_score = 0;
        self.turn = Seat::Player;
        self.turn_number = 1;
        self.pass_count = 0;
        self.pending.clear();
        self.last_move = None;
        self.challenge_remaining = None;
        self.winner = None;
        self.started_at = now();
        self.elapsed_before = Duration::ZERO;
        self.recent_changes.clear();
        self.move_log.clear();
        self.game_id = None;
        self.saved_moves = 0;
        self.stats_recorded = false;
    }

    pub fn phase(&self) -> Phase {
        if self.winner.is_some() {
            Phase::GameOver
        } else if self.turn == Seat::Ai {
            Phase::AiThinking
        } else if self.challenge_remaining.is_some() {
            Phase::ChallengeWindow
        } else if !self.pending.is_empty() {
            Phase::AwaitingPlayerSubmit
        } else {
            Phase::AwaitingPlayerPlacement
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn bag(&self) -> &TileBag {
        &self.bag
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn ai_player(&self) -> &Player {
        &self.ai_player
    }

    pub fn score(&self, seat: Seat) -> i32 {
        match seat {
            Seat::Player => self.player_score,
            Seat::Ai => self.ai_score,
        }
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn turn_number(&self) -> usize {
        self.turn_number
    }

    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    pub fn pending(&self) -> &[Placement] {
        &self.pending
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    pub fn is_game_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// What changed during the most recent action.
    pub fn recent_changes(&self) -> &[Change] {
        &self.recent_changes
    }

    pub fn move_log(&self) -> &[MoveRecord] {
        &self.move_log
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_before + Duration::seconds(now().saturating_sub(self.started_at) as i64)
    }

    pub fn info(&self) -> GameInfo {
        GameInfo {
            phase: self.phase(),
            player_score: self.player_score,
            ai_score: self.ai_score,
            turn: self.turn,
            turn_number: self.turn_number,
            tiles_remaining: self.bag.remaining_count(),
            elapsed: self.elapsed(),
            last_move: self.last_move.as_ref().map(|last| LastMove {
                seat: last.seat,
                word: last.mv.word.clone(),
                score: last.mv.score,
            }),
            challenge_remaining: self.challenge_remaining,
        }
    }

    fn seat(&self, seat: Seat) -> &Player {
        match seat {
            Seat::Player => &self.player,
            Seat::Ai => &self.ai_player,
        }
    }

    fn seat_mut(&mut self, seat: Seat) -> &mut Player {
        match seat {
            Seat::Player => &mut self.player,
            Seat::Ai => &mut self.ai_player,
        }
    }

    fn score_mut(&mut self, seat: Seat) -> &mut i32 {
        match seat {
            Seat::Player => &mut self.player_score,
            Seat::Ai => &mut self.ai_score,
        }
    }

    fn begin_action(&mut self, seat: Seat) -> Result<(), GamePlayError> {
        if self.winner.is_some() {
            return Err(GamePlayError::GameOver);
        }
        if self.turn != seat {
            return Err(GamePlayError::NotYourTurn);
        }
        self.recent_changes.clear();
        Ok(())
    }

    /// The human acting at all means they let the last move stand.
    fn close_challenge_window(&mut self) {
        if self.challenge_remaining.take().is_some() {
            self.recent_changes
                .push(Change::Challenge(ChallengeOutcome::Expired));
        }
    }

    pub fn place_tile(&mut self, position: Coordinate, tile: Tile) -> Result<(), GamePlayError> {
        self.begin_action(Seat::Player)?;
        if tile.blank && !tile.is_designated() {
            return Err(GamePlayError::UndesignatedBlank);
        }
        if !self.board.in_bounds(position) {
            return Err(GamePlayError::OutSideBoardDimensions { position });
        }
        if self.board.occupied(position) {
            return Err(GamePlayError::OccupiedPlace { position });
        }
        let Some(from_rack) = self.player.rack.take(&tile) else {
            return Err(GamePlayError::TileNotInRack { tile: tile.letter });
        };
        self.close_challenge_window();

        let placed = if from_rack.blank { tile } else { from_rack };
        self.board.place(position, placed)?;
        self.pending.push((position, placed));

        self.recent_changes.push(Change::Board(BoardChange {
            coordinate: position,
            tile: placed,
            action: BoardChangeAction::Added,
        }));
        self.push_rack_change(Seat::Player, vec![from_rack], vec![]);
        Ok(())
    }

    pub fn remove_tile(&mut self, position: Coordinate) -> Result<Tile, GamePlayError> {
        self.begin_action(Seat::Player)?;
        let index = self
            .pending
            .iter()
            .position(|(p, _)| *p == position)
            .ok_or(GamePlayError::NotPendingPlacement { position })?;

        let (_, tile) = self.pending.remove(index);
        self.board.remove(position)?;
        self.player.rack.add(tile);

        self.recent_changes.push(Change::Board(BoardChange {
            coordinate: position,
            tile,
            action: BoardChangeAction::Removed,
        }));
        self.push_rack_change(Seat::Player, vec![], vec![tile.undesignated()]);
        Ok(tile.undesignated())
    }

    /// Takes every pending tile back to the rack.
    pub fn recall_tiles(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let mut returned = vec![];
        for (position, tile) in pending.into_iter().rev() {
            if self.board.remove(position).is_ok() {
                self.recent_changes.push(Change::Board(BoardChange {
                    coordinate: position,
                    tile,
                    action: BoardChangeAction::Removed,
                }));
            }
            self.player.rack.add(tile);
            returned.push(tile.undesignated());
        }
        if !returned.is_empty() {
            self.push_rack_change(Seat::Player, vec![], returned);
        }
    }

    pub fn submit_move(&mut self) -> Result<MoveResult, GamePlayError> {
        self.begin_action(Seat::Player)?;
        if self.pending.is_empty() {
            return Err(GamePlayError::NoPendingPlacement);
        }
        self.close_challenge_window();

        let words = match self.validate_pending() {
            Ok(words) => words,
            Err(e) => {
                warn!("Rejected move: {e}");
                self.recall_tiles();
                return Err(e);
            }
        };

        let placements = std::mem::take(&mut self.pending);
        let score = self.scorer.score_move(&words, &self.board)
            + self.scorer.bingo_for(placements.len());
        let main = words
            .iter()
            .max_by_key(|w| w.word.len())
            .cloned()
            .ok_or(GamePlayError::NoWordFormed)?;
        let orientation = line_orientation(&main.positions);
        let start = main.positions[0];

        let mv = Move {
            word: main.word.clone(),
            start,
            orientation,
            placements,
            words,
            score,
        };
        let command = PlacementCommand::place(&mv.placements);
        let message = format!("Played {} for {} points", mv.word, mv.score);
        self.commit(Seat::Player, mv, command);

        Ok(MoveResult {
            success: true,
            message,
            score,
        })
    }

    /// Checks the pending tiles against the placement rules and the dictionary,
    /// returning the words they form.
    fn validate_pending(&self) -> Result<Vec<FormedWord>, GamePlayError> {
        let positions: Vec<Coordinate> = self.pending.iter().map(|(p, _)| *p).collect();

        let same_row = positions.iter().all(|p| p.row == positions[0].row);
        let same_col = positions.iter().all(|p| p.col == positions[0].col);
        if !same_row && !same_col {
            return Err(GamePlayError::NonLinearPlacement);
        }

        let orientation = if same_row {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let first = positions.iter().min().copied().unwrap_or(positions[0]);
        let last = positions.iter().max().copied().unwrap_or(positions[0]);
        let span = match orientation {
            Orientation::Horizontal => last.col - first.col,
            Orientation::Vertical => last.row - first.row,
        };
        if (0..=span).any(|step| !self.board.occupied(first.step(orientation, step))) {
            return Err(GamePlayError::GapInPlacement);
        }

        let first_move = self.board.tile_count() == self.pending.len();
        if first_move {
            if !positions.contains(&self.board.center()) {
                return Err(GamePlayError::FirstMoveMissesCenter);
            }
        } else {
            let connected = positions.iter().any(|p| {
                self.board
                    .neighbouring_squares(*p)
                    .iter()
                    .any(|(n, tile)| tile.is_some() && !positions.contains(n))
            });
            if !connected {
                return Err(GamePlayError::DisconnectedPlacement);
            }
        }

        let words = self.board.words_formed(&self.pending);
        if words.is_empty() {
            return Err(GamePlayError::NoWordFormed);
        }
        let theme = self.config.theme.as_deref();
        let mut invalid: Vec<String> = words
            .iter()
            .filter(|w| !self.dictionary.is_valid(&w.word, theme))
            .map(|w| w.word.clone())
            .collect();
        invalid.dedup();
        if !invalid.is_empty() {
            return Err(GamePlayError::InvalidWords { words: invalid });
        }

        Ok(words)
    }

    pub fn pass_turn(&mut self) -> Result<(), GamePlayError> {
        self.begin_action(Seat::Player)?;
        self.close_challenge_window();
        self.recall_tiles();
        self.register_pass(Seat::Player);
        Ok(())
    }

    /// Swaps rack tiles for fresh ones from the bag. Costs the turn, like a pass.
    pub fn exchange_tiles(&mut self, tiles: &[Tile]) -> Result<Vec<Tile>, GamePlayError> {
        self.begin_action(Seat::Player)?;
        if tiles.is_empty() {
            return Err(GamePlayError::EmptyExchange);
        }
        if tiles.len() > self.bag.remaining_count() {
            return Err(GamePlayError::BagTooSmall {
                requested: tiles.len(),
                remaining: self.bag.remaining_count(),
            });
        }
        // Pending tiles count as rack tiles, since they are recalled before the swap.
        let mut holding = self.player.rack.clone();
        holding.extend(self.pending.iter().map(|(_, t)| *t));
        for tile in tiles {
            if holding.take(tile).is_none() {
                return Err(GamePlayError::TileNotInRack { tile: tile.letter });
            }
        }

        self.close_challenge_window();
        self.recall_tiles();
        let Some(removed) = self.player.rack.remove_all(tiles) else {
            return Err(GamePlayError::TileNotInRack { tile: Tile::BLANK });
        };
        let drawn = self.bag.exchange(&removed);
        self.player.rack.extend(drawn.iter().copied());
        self.push_rack_change(Seat::Player, removed.clone(), drawn.clone());
        info!("Player exchanged {} tiles", removed.len());

        self.register_pass(Seat::Player);
        Ok(drawn)
    }

    /// Lets the AI take its turn. Returns the move it played, or `None` if it passed.
    pub fn ai_move(&mut self) -> Result<Option<Move>, GamePlayError> {
        self.begin_action(Seat::Ai)?;

        let tiles_remaining = self.bag.remaining_count();
        let ctx = SearchContext {
            dictionary: self.dictionary.as_ref(),
            scorer: &self.scorer,
            theme: self.config.theme.as_deref(),
        };
        let chosen = self.ai.make_move(
            &mut self.board,
            &mut self.ai_player.rack,
            ctx,
            tiles_remaining,
        );

        match chosen {
            Some(mv) => {
                self.commit_ai_move(mv.clone())?;
                Ok(Some(mv))
            }
            None => {
                info!("AI passes");
                self.register_pass(Seat::Ai);
                Ok(None)
            }
        }
    }

    fn commit_ai_move(&mut self, mv: Move) -> Result<(), GamePlayError> {
        let transaction = MoveTransaction::begin(&mut self.board, &mut self.ai_player.rack, &mv)?;
        let command = transaction.commit();
        self.commit(Seat::Ai, mv, command);
        if !self.is_game_over() {
            self.challenge_remaining = Some(self.config.rules.challenge_seconds);
        }
        Ok(())
    }

    /// Books a move whose tiles are already on the board and off the rack.
    fn commit(&mut self, seat: Seat, mv: Move, command: PlacementCommand) {
        for (position, tile) in &mv.placements {
            self.recent_changes.push(Change::Board(BoardChange {
                coordinate: *position,
                tile: *tile,
                action: BoardChangeAction::Added,
            }));
        }

        let score = {
            let score = self.score_mut(seat);
            *score += mv.score as i32;
            *score
        };
        self.recent_changes.push(Change::Score { seat, score });

        let drawn = {
            let bag = &mut self.bag;
            let rack = match seat {
                Seat::Player => &mut self.player.rack,
                Seat::Ai => &mut self.ai_player.rack,
            };
            rack.refill(bag)
        };
        self.push_rack_change(seat, mv.rack_tiles(), drawn.clone());

        info!("{seat} played {mv}");
        self.move_log.push(MoveRecord {
            player_id: self.seat(seat).id,
            word: mv.word.clone(),
            score: mv.score,
            position: mv
                .placements
                .iter()
                .map(|(p, _)| p.to_string())
                .collect::<Vec<_>>()
                .join(","),
            direction: mv.orientation,
            move_number: self.move_log.len() + 1,
        });

        self.last_move = Some(CommittedMove {
            seat,
            mv,
            command,
            drawn,
        });
        self.pass_count = 0;
        self.end_turn(seat);
    }

    fn register_pass(&mut self, seat: Seat) {
        self.pass_count += 1;
        self.end_turn(seat);
    }

    fn end_turn(&mut self, seat: Seat) {
        self.turn = seat.opponent();
        if seat == Seat::Ai {
            self.turn_number += 1;
        }
        self.check_game_over();
    }

    /// Challenges a word from the AI's last move.
    pub fn challenge_word(&mut self, word: &str) -> Result<ChallengeOutcome, GamePlayError> {
        if self.winner.is_some() {
            return Err(GamePlayError::GameOver);
        }
        if self.challenge_remaining.is_none() {
            return Err(GamePlayError::ChallengeClosed);
        }
        let Some(last) = self.last_move.as_ref().filter(|l| l.seat == Seat::Ai) else {
            return Err(GamePlayError::ChallengeClosed);
        };
        let word = word.trim().to_ascii_uppercase();
        if !last.mv.words.iter().any(|w| w.word == word) {
            return Err(GamePlayError::NotChallengeable { word });
        }
        self.recent_changes.clear();
        self.challenge_remaining = None;

        let outcome = if self
            .dictionary
            .is_valid(&word, self.config.theme.as_deref())
        {
            let penalty = self.config.rules.challenge_penalty;
            self.player_score = (self.player_score - penalty as i32).max(0);
            self.recent_changes.push(Change::Score {
                seat: Seat::Player,
                score: self.player_score,
            });
            ChallengeOutcome::Rejected { word, penalty }
        } else {
            let Some(last) = self.last_move.take() else {
                return Err(GamePlayError::ChallengeClosed);
            };
            self.take_back(last, word)?
        };

        info!("{outcome}");
        self.recent_changes.push(Change::Challenge(outcome.clone()));
        Ok(outcome)
    }

    fn take_back(
        &mut self,
        last: CommittedMove,
        word: String,
    ) -> Result<ChallengeOutcome, GamePlayError> {
        let seat = last.seat;
        last.command.inverse().apply(&mut self.board)?;

        let refilled = self.seat_mut(seat).rack.remove_all(&last.drawn);
        debug_assert!(refilled.is_some(), "Refill tiles should still be on the rack");
        self.bag.return_tiles(last.drawn.iter().copied());
        self.seat_mut(seat).rack.extend(last.mv.rack_tiles());
        for (position, tile) in &last.mv.placements {
            self.recent_changes.push(Change::Board(BoardChange {
                coordinate: *position,
                tile: *tile,
                action: BoardChangeAction::Removed,
            }));
        }
        self.push_rack_change(seat, last.drawn.clone(), last.mv.rack_tiles());

        let score = self.score_mut(seat);
        *score -= last.mv.score as i32;
        let score = *score;
        self.recent_changes.push(Change::Score { seat, score });

        if self
            .move_log
            .last()
            .map_or(false, |m| m.word == last.mv.word)
        {
            self.move_log.pop();
            self.saved_moves = self.saved_moves.min(self.move_log.len());
        }

        Ok(ChallengeOutcome::Upheld {
            word,
            points_removed: last.mv.score,
        })
    }

    /// Runs the challenge countdown. Returns the outcome once the window closes.
    pub fn tick_challenge(&mut self, elapsed_secs: u32) -> Option<ChallengeOutcome> {
        let remaining = self.challenge_remaining?;
        let remaining = remaining.saturating_sub(elapsed_secs);
        if remaining > 0 {
            self.challenge_remaining = Some(remaining);
            return None;
        }
        self.challenge_remaining = None;
        self.recent_changes
            .push(Change::Challenge(ChallengeOutcome::Expired));
        Some(ChallengeOutcome::Expired)
    }

    fn check_game_over(&mut self) {
        if self.winner.is_some() {
            return;
        }
        let racks_out = self.player.rack.is_empty() || self.ai_player.rack.is_empty();
        if self.pass_count >= self.config.rules.pass_limit || (self.bag.is_empty() && racks_out) {
            self.finish();
        }
    }

    fn finish(&mut self) {
        let player_left = self.player.rack.total_value() as i32;
        let ai_left = self.ai_player.rack.total_value() as i32;

        if self.player.rack.is_empty() {
            self.player_score += ai_left;
            self.ai_score -= ai_left;
        } else if self.ai_player.rack.is_empty() {
            self.ai_score += player_left;
            self.player_score -= player_left;
        } else {
            self.player_score -= player_left;
            self.ai_score -= ai_left;
        }

        let winner = match self.player_score.cmp(&self.ai_score) {
            std::cmp::Ordering::Greater => Winner::Seat(Seat::Player),
            std::cmp::Ordering::Less => Winner::Seat(Seat::Ai),
            std::cmp::Ordering::Equal => Winner::Tie,
        };
        self.challenge_remaining = None;
        self.winner = Some(winner.clone());

        info!(
            "Game over, winner: {winner} ({} - {})",
            self.player_score, self.ai_score
        );
        self.recent_changes.push(Change::GameOver(GameOverReport {
            winner,
            player_score: self.player_score,
            ai_score: self.ai_score,
        }));
    }

    fn push_rack_change(&mut self, seat: Seat, removed: Vec<Tile>, added: Vec<Tile>) {
        self.recent_changes.push(Change::Rack(RackChange {
            seat,
            removed: removed.iter().map(|t| t.letter).collect(),
            added: added.iter().map(|t| t.letter).collect(),
        }));
    }

    fn record(&self) -> Result<GameRecord, StoreError> {
        Ok(GameRecord {
            player_id: self.player.id,
            difficulty: self.ai.difficulty(),
            player_score: self.player_score,
            ai_score: self.ai_score,
            winner: self.winner.clone(),
            duration: self.elapsed(),
            board_snapshot: BoardSnapshot::capture(&self.board).to_json()?,
            completed: self.winner.is_some(),
        })
    }

    /// Writes the game and any moves not yet stored. Player stats are recorded once, when a finished game is saved.
    pub fn save_game(&mut self, store: &mut dyn GameStore) -> Result<GameId, StoreError> {
        let record = self.record()?;
        let id = match self.game_id {
            Some(id) => {
                store.update_game(id, &record)?;
                store.discard_moves_after(id, self.saved_moves)?;
                id
            }
            None => store.save_game(&record)?,
        };
        self.game_id = Some(id);

        for record in &self.move_log[self.saved_moves.min(self.move_log.len())..] {
            store.save_move(id, record)?;
        }
        self.saved_moves = self.move_log.len();

        if record.completed && !self.stats_recorded {
            store.update_player_stats(
                self.player.id,
                1,
                self.player_score,
                Some(self.player_score),
            )?;
            self.stats_recorded = true;
        }
        Ok(id)
    }

    /// Picks a stored game back up with the human to move. Racks are dealt fresh
    /// from what is left once the board's tiles are out of the bag.
    pub fn load_game(
        store: &dyn GameStore,
        id: GameId,
        player: Player,
        dictionary: Box<dyn Dictionary>,
        mut config: GameConfig,
    ) -> Result<Self, StoreError> {
        let saved = store.load_game(id)?;
        config.difficulty = saved.game.difficulty;

        let mut game = Self::new(player, dictionary, config);
        game.player.rack.drain();
        game.ai_player.rack.drain();
        game.bag = TileBag::new(&game.config.rules.tile_distribution, game.config.tile_seed);

        BoardSnapshot::from_json(&saved.game.board_snapshot)?.restore(&mut game.board)?;
        for (_, tile) in game.board.tiles() {
            game.bag.remove_tile(&tile);
        }
        game.player.rack.refill(&mut game.bag);
        game.ai_player.rack.refill(&mut game.bag);

        game.player_score = saved.game.player_score;
        game.ai_score = saved.game.ai_score;
        game.winner = saved.game.winner.clone();
        game.elapsed_before = saved.game.duration;
        game.turn_number = saved
            .moves
            .iter()
            .filter(|m| m.player_id == AI_PLAYER_ID)
            .count()
            + 1;
        game.saved_moves = saved.moves.len();
        game.move_log = saved.moves;
        game.game_id = Some(id);
        game.stats_recorded = saved.game.completed;

        info!("Loaded game {id} with {} tiles on the board", game.board.tile_count());
        Ok(game)
    }
}

/// The orientation of a straight run of cells. Lone cells count as horizontal.
fn line_orientation(positions: &[Coordinate]) -> Orientation {
    match positions {
        [a, b, ..] if a.col == b.col => Orientation::Vertical,
        _ => Orientation::Horizontal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{tests::dict, Judge};
    use crate::persistence::MemoryStore;
    use crate::rules::{Difficulty, GameRules};

    fn c(row: usize, col: usize) -> Coordinate {
        Coordinate::new(row, col)
    }

    fn config(difficulty: Difficulty) -> GameConfig {
        GameConfig {
            difficulty,
            theme: None,
            rules: GameRules::default(),
            tile_seed: Some(42),
        }
    }

    fn test_game(dictionary: Judge) -> GameController {
        GameController::new(
            Player::human(1, "Ada".into(), 7),
            Box::new(dictionary),
            config(Difficulty::Easy),
        )
    }

    /// Swaps a rack's contents for the given letters without creating or losing tiles.
    /// Letters the bag has run out of are taken from the other rack, which draws a replacement.
    fn set_rack(game: &mut GameController, seat: Seat, letters: &str) {
        let old = game.seat_mut(seat).rack.drain();
        game.bag.return_tiles(old);
        for letter in letters.chars() {
            let wanted = if letter == '?' {
                Tile::blank()
            } else {
                Tile::standard(letter)
            };
            let tile = match game.bag.remove_tile(&wanted) {
                Some(tile) => tile,
                None => {
                    let tile = game
                        .seat_mut(seat.opponent())
                        .rack
                        .take(&wanted)
                        .expect("Tile should be in the bag or the other rack");
                    let replacement = game.bag.draw_tile().expect("Bag should have spares");
                    game.seat_mut(seat.opponent()).rack.add(replacement);
                    tile
                }
            };
            game.seat_mut(seat).rack.add(tile);
        }
    }

    fn play_word(game: &mut GameController, word: &str, start: Coordinate, orientation: Orientation) {
        for (offset, letter) in word.chars().enumerate() {
            game.place_tile(start.step(orientation, offset), Tile::standard(letter))
                .unwrap();
        }
    }

    fn play_hello(game: &mut GameController) -> MoveResult {
        set_rack(game, Seat::Player, "HELLOAB");
        play_word(game, "HELLO", c(7, 5), Orientation::Horizontal);
        game.submit_move().unwrap()
    }

    #[test]
    fn starts_with_full_racks() {
        let game = test_game(dict());
        assert_eq!(game.player().rack.len(), 7);
        assert_eq!(game.ai_player().rack.len(), 7);
        assert_eq!(game.bag().remaining_count(), 86);
        assert_eq!(game.turn(), Seat::Player);
        assert_eq!(game.phase(), Phase::AwaitingPlayerPlacement);
        assert!(game.board().is_empty());
    }

    #[test]
    fn hello_opening() {
        let mut game = test_game(dict());
        let result = play_hello(&mut game);

        assert_eq!(result.score, 16);
        assert_eq!(result.message, "Played HELLO for 16 points");
        assert_eq!(game.score(Seat::Player), 16);
        assert_eq!(game.player().rack.len(), 7);
        assert_eq!(game.bag().remaining_count(), 81);
        assert_eq!(game.turn(), Seat::Ai);
        assert_eq!(game.phase(), Phase::AiThinking);
        assert_eq!(game.move_log()[0].position, "(7,5),(7,6),(7,7),(7,8),(7,9)");
        assert_eq!(game.move_log()[0].direction, Orientation::Horizontal);

        insta::with_settings!({
            description => game.board().to_string(),
            omit_expression => true
        }, {
            insta::assert_snapshot!(game.info().to_string(), @"Turn 1 (AI) | Player 16 - AI 0 | 81 tiles left | Player played HELLO for 16");
        });
    }

    #[test]
    fn placement_errors() {
        let mut game = test_game(dict());
        set_rack(&mut game, Seat::Player, "CAT?");

        assert_eq!(
            game.place_tile(c(7, 7), Tile::standard('Z')),
            Err(GamePlayError::TileNotInRack { tile: 'Z' })
        );
        assert_eq!(
            game.place_tile(c(7, 7), Tile::blank()),
            Err(GamePlayError::UndesignatedBlank)
        );
        assert_eq!(
            game.place_tile(c(15, 7), Tile::standard('C')),
            Err(GamePlayError::OutSideBoardDimensions { position: c(15, 7) })
        );

        game.place_tile(c(7, 7), Tile::standard('C')).unwrap();
        assert_eq!(game.phase(), Phase::AwaitingPlayerSubmit);
        assert_eq!(
            game.place_tile(c(7, 7), Tile::standard('A')),
            Err(GamePlayError::OccupiedPlace { position: c(7, 7) })
        );
        assert_eq!(game.player().rack.letters(), "AT?");

        assert_eq!(
            game.remove_tile(c(7, 8)),
            Err(GamePlayError::NotPendingPlacement { position: c(7, 8) })
        );
        assert_eq!(game.remove_tile(c(7, 7)), Ok(Tile::standard('C')));
        assert!(game.board().is_empty());
        assert_eq!(game.player().rack.len(), 4);

        game.place_tile(c(7, 7), Tile::blank().designate('s'))
            .unwrap();
        assert_eq!(game.board().get(c(7, 7)), Some(Tile::blank().designate('S')));
        assert_eq!(game.player().rack.letters(), "ATC");
    }

    #[test]
    fn rejected_moves_go_back_to_the_rack() {
        let mut game = test_game(dict());
        set_rack(&mut game, Seat::Player, "HELLOAB");
        let rack_before = game.player().rack.clone();

        let mut attempt = |placements: &[(Coordinate, char)]| {
            for (position, letter) in placements {
                game.place_tile(*position, Tile::standard(*letter)).unwrap();
            }
            let result = game.submit_move();
            assert!(game.board().is_empty());
            assert!(game.player().rack.same_tiles(&rack_before));
            assert_eq!(game.phase(), Phase::AwaitingPlayerPlacement);
            result.unwrap_err()
        };

        assert_eq!(
            attempt(&[(c(7, 7), 'H'), (c(8, 8), 'E')]),
            GamePlayError::NonLinearPlacement
        );
        assert_eq!(
            attempt(&[(c(7, 7), 'A'), (c(7, 9), 'B')]),
            GamePlayError::GapInPlacement
        );
        assert_eq!(
            attempt(&[(c(3, 3), 'A'), (c(3, 4), 'B')]),
            GamePlayError::FirstMoveMissesCenter
        );
        assert_eq!(attempt(&[(c(7, 7), 'A')]), GamePlayError::NoWordFormed);
        assert_eq!(
            attempt(&[(c(7, 6), 'H'), (c(7, 7), 'L'), (c(7, 8), 'E')]),
            GamePlayError::InvalidWords {
                words: vec!["HLE".into()]
            }
        );
        assert_eq!(
            GamePlayError::InvalidWords {
                words: vec!["HLE".into(), "QX".into()]
            }
            .to_string(),
            "Invalid word(s): HLE, QX"
        );
    }

    #[test]
    fn later_moves_must_connect() {
        let mut game = test_game(Judge::new(["hello", "be", "ab", "lo"]));
        play_hello(&mut game);
        game.turn = Seat::Player;
        set_rack(&mut game, Seat::Player, "BEAB");

        game.place_tile(c(2, 2), Tile::standard('B')).unwrap();
        game.place_tile(c(2, 3), Tile::standard('E')).unwrap();
        assert_eq!(game.submit_move(), Err(GamePlayError::DisconnectedPlacement));

        // B under the first L makes LB, which isn't a word
        game.place_tile(c(8, 7), Tile::standard('B')).unwrap();
        game.place_tile(c(8, 8), Tile::standard('E')).unwrap();
        assert_eq!(
            game.submit_move(),
            Err(GamePlayError::InvalidWords {
                words: vec!["LB".into(), "LE".into()]
            })
        );
        assert_eq!(game.board().tile_count(), 5);
    }

    #[test]
    fn bingo_adds_fifty_once() {
        let mut game = test_game(Judge::new(["tearing"]));
        set_rack(&mut game, Seat::Player, "TEARING");
        play_word(&mut game, "TEARING", c(7, 4), Orientation::Horizontal);

        let result = game.submit_move().unwrap();
        assert_eq!(result.score, (1 + 1 + 1 + 1 + 1 + 1 + 2) * 2 + 50);
    }

    #[test]
    fn six_passes_end_the_game() {
        let mut game = test_game(Judge::default());
        set_rack(&mut game, Seat::Player, "QZ");
        set_rack(&mut game, Seat::Ai, "AE");

        for _ in 0..3 {
            game.pass_turn().unwrap();
            assert_eq!(game.ai_move(), Ok(None));
        }

        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.score(Seat::Player), -20);
        assert_eq!(game.score(Seat::Ai), -2);
        assert_eq!(game.winner(), Some(&Winner::Seat(Seat::Ai)));
        assert!(game.recent_changes().contains(&Change::GameOver(GameOverReport {
            winner: Winner::Seat(Seat::Ai),
            player_score: -20,
            ai_score: -2,
        })));
        assert_eq!(game.pass_turn(), Err(GamePlayError::GameOver));
    }

    #[test]
    fn going_out_collects_the_opponents_tiles() {
        let mut game = test_game(dict());
        game.bag.draw(game.bag.remaining_count());
        game.player.rack.drain();
        game.player.rack.extend([Tile::standard('H'), Tile::standard('E')]);
        let ai_left = game.ai_player().rack.total_value() as i32;

        play_word(&mut game, "HE", c(7, 7), Orientation::Horizontal);
        game.submit_move().unwrap();

        assert!(game.is_game_over());
        assert_eq!(game.score(Seat::Player), 10 + ai_left);
        assert_eq!(game.score(Seat::Ai), -ai_left);
        assert_eq!(game.winner(), Some(&Winner::Seat(Seat::Player)));
    }

    #[test]
    fn turn_order() {
        let mut game = test_game(dict());
        assert_eq!(game.ai_move(), Err(GamePlayError::NotYourTurn));
        play_hello(&mut game);
        assert_eq!(game.pass_turn(), Err(GamePlayError::NotYourTurn));
        set_rack(&mut game, Seat::Ai, "EAAIIOU");

        let played = game.ai_move().unwrap();
        let mv = played.expect("The AI should find a hook onto HELLO");
        assert_eq!(game.board().tile_count(), 5 + mv.tiles_used());
        assert_eq!(game.score(Seat::Ai), mv.score as i32);
        assert_eq!(game.ai_player().rack.len(), 7);
        assert_eq!(game.turn(), Seat::Player);
        assert_eq!(game.turn_number(), 2);
        assert_eq!(game.phase(), Phase::ChallengeWindow);
        assert_eq!(game.info().challenge_remaining, Some(30));
    }

    fn ai_plays(game: &mut GameController, word: &str, start: Coordinate, orientation: Orientation) -> Move {
        let evaluation = game.scorer.evaluate_placement(
            word,
            start,
            orientation,
            game.ai_player.rack.tiles(),
            &mut game.board,
        );
        assert!(evaluation.valid);
        let mv = Move {
            word: word.into(),
            start,
            orientation,
            placements: evaluation.placements,
            words: evaluation.words,
            score: evaluation.score,
        };
        game.commit_ai_move(mv.clone()).unwrap();
        mv
    }

    #[test]
    fn upheld_challenge_takes_the_move_back() {
        let mut game = test_game(dict());
        play_hello(&mut game);
        set_rack(&mut game, Seat::Ai, "ZQXEEEE");
        let rack_before = game.ai_player().rack.clone();
        let bag_before = game.bag().remaining_count();

        let mv = ai_plays(&mut game, "HZ", c(7, 5), Orientation::Vertical);
        assert!(mv.score > 0);
        assert_eq!(game.score(Seat::Ai), mv.score as i32);
        assert_eq!(game.board().get(c(8, 5)), Some(Tile::standard('Z')));
        assert_eq!(game.bag().remaining_count(), bag_before - 1);
        assert_eq!(game.phase(), Phase::ChallengeWindow);

        assert_eq!(
            game.challenge_word("zz"),
            Err(GamePlayError::NotChallengeable { word: "ZZ".into() })
        );
        let outcome = game.challenge_word("hz").unwrap();
        assert_eq!(
            outcome,
            ChallengeOutcome::Upheld {
                word: "HZ".into(),
                points_removed: mv.score
            }
        );
        assert_eq!(game.board().get(c(8, 5)), None);
        assert_eq!(game.board().tile_count(), 5);
        assert_eq!(game.score(Seat::Ai), 0);
        assert_eq!(game.score(Seat::Player), 16);
        assert!(game.ai_player().rack.same_tiles(&rack_before));
        assert_eq!(game.bag().remaining_count(), bag_before);
        assert_eq!(game.phase(), Phase::AwaitingPlayerPlacement);
        assert_eq!(game.challenge_word("HZ"), Err(GamePlayError::ChallengeClosed));
    }

    #[test]
    fn failed_challenge_costs_the_challenger() {
        let mut game = test_game(dict());
        play_hello(&mut game);
        set_rack(&mut game, Seat::Ai, "EQXZIAA");

        let mv = ai_plays(&mut game, "HE", c(7, 5), Orientation::Vertical);
        let outcome = game.challenge_word("HE").unwrap();

        assert_eq!(
            outcome,
            ChallengeOutcome::Rejected {
                word: "HE".into(),
                penalty: 10
            }
        );
        assert_eq!(game.score(Seat::Player), 16 - 10);
        assert_eq!(game.score(Seat::Ai), mv.score as i32);
        assert_eq!(game.board().get(c(8, 5)), Some(Tile::standard('E')));
        assert_eq!(game.phase(), Phase::AwaitingPlayerPlacement);
    }

    #[test]
    fn challenge_window_times_out() {
        let mut game = test_game(dict());
        play_hello(&mut game);
        set_rack(&mut game, Seat::Ai, "EAAIIOU");
        ai_plays(&mut game, "HE", c(7, 5), Orientation::Vertical);

        assert_eq!(game.tick_challenge(20), None);
        assert_eq!(game.info().challenge_remaining, Some(10));
        assert_eq!(game.tick_challenge(15), Some(ChallengeOutcome::Expired));
        assert_eq!(game.phase(), Phase::AwaitingPlayerPlacement);
        assert_eq!(game.challenge_word("HE"), Err(GamePlayError::ChallengeClosed));
    }

    #[test]
    fn acting_closes_the_challenge_window() {
        let mut game = test_game(dict());
        play_hello(&mut game);
        set_rack(&mut game, Seat::Ai, "EAAIIOU");
        ai_plays(&mut game, "HE", c(7, 5), Orientation::Vertical);

        game.pass_turn().unwrap();
        assert!(game
            .recent_changes()
            .contains(&Change::Challenge(ChallengeOutcome::Expired)));
        assert_eq!(game.challenge_word("HE"), Err(GamePlayError::ChallengeClosed));
    }

    #[test]
    fn exchanges() {
        let mut game = test_game(dict());
        set_rack(&mut game, Seat::Player, "QV?ZXJK");

        assert_eq!(game.exchange_tiles(&[]), Err(GamePlayError::EmptyExchange));
        assert_eq!(
            game.exchange_tiles(&[Tile::standard('E')]),
            Err(GamePlayError::TileNotInRack { tile: 'E' })
        );
        assert_eq!(game.turn(), Seat::Player);

        let drawn = game
            .exchange_tiles(&[Tile::standard('Q'), Tile::standard('Z')])
            .unwrap();
        assert_eq!(drawn.len(), 2);
        assert_eq!(game.player().rack.len(), 7);
        assert_eq!(game.bag().remaining_count(), 86);
        assert_eq!(game.pass_count(), 1);
        assert_eq!(game.turn(), Seat::Ai);

        game.turn = Seat::Player;
        game.bag.draw(game.bag.remaining_count() - 1);
        assert_eq!(
            game.exchange_tiles(&[Tile::standard('V'), Tile::standard('X')]),
            Err(GamePlayError::BagTooSmall {
                requested: 2,
                remaining: 1
            })
        );
    }

    #[test]
    fn exchanges_swap_the_racks_own_tiles() {
        let mut game = test_game(dict());
        set_rack(&mut game, Seat::Player, "QJEAIOU");
        game.place_tile(c(7, 7), Tile::standard('J')).unwrap();

        assert_eq!(
            game.exchange_tiles(&[Tile::standard('Z')]),
            Err(GamePlayError::TileNotInRack { tile: 'Z' })
        );
        assert_eq!(game.pending().len(), 1);
        assert_eq!(game.phase(), Phase::AwaitingPlayerSubmit);

        game.exchange_tiles(&[Tile::new('Q', 0), Tile::new('J', 0)])
            .unwrap();
        assert!(game.board().is_empty());
        assert_eq!(game.player().rack.len(), 7);
        let in_bag = |letter: char| -> Vec<u32> {
            game.bag()
                .remaining_tiles()
                .iter()
                .filter(|t| t.letter == letter)
                .map(|t| t.value)
                .collect()
        };
        assert_eq!(in_bag('Q'), vec![10]);
        assert_eq!(in_bag('J'), vec![8]);
    }

    #[test]
    fn retracted_moves_leave_the_store() {
        let mut game = test_game(dict());
        play_hello(&mut game);
        set_rack(&mut game, Seat::Ai, "ZQXEEEE");
        ai_plays(&mut game, "HZ", c(7, 5), Orientation::Vertical);

        let mut store = MemoryStore::new();
        let id = game.save_game(&mut store).unwrap();
        assert_eq!(store.load_game(id).unwrap().moves.len(), 2);

        game.challenge_word("HZ").unwrap();
        let words = |store: &MemoryStore| -> Vec<String> {
            store
                .load_game(id)
                .unwrap()
                .moves
                .into_iter()
                .map(|m| m.word)
                .collect()
        };
        game.save_game(&mut store).unwrap();
        assert_eq!(words(&store), vec!["HELLO"]);

        set_rack(&mut game, Seat::Player, "EAAIIOU");
        game.place_tile(c(8, 5), Tile::standard('E')).unwrap();
        game.submit_move().unwrap();
        game.save_game(&mut store).unwrap();
        assert_eq!(words(&store), vec!["HELLO", "HE"]);

        let loaded = GameController::load_game(
            &store,
            id,
            Player::human(1, "Ada".into(), 7),
            Box::new(dict()),
            config(Difficulty::Easy),
        )
        .unwrap();
        assert_eq!(loaded.move_log(), game.move_log());
        assert_eq!(loaded.board().get(c(8, 5)), Some(Tile::standard('E')));
        assert_eq!(loaded.board().tile_count(), 6);
    }

    #[test]
    fn saves_and_loads() {
        let mut game = test_game(dict());
        play_hello(&mut game);
        set_rack(&mut game, Seat::Ai, "EAAIIOU");
        assert!(game.ai_move().unwrap().is_some());
        let tiles_on_board = game.board().tile_count();

        let mut store = MemoryStore::new();
        let id = game.save_game(&mut store).unwrap();
        assert_eq!(store.load_game(id).unwrap().moves.len(), game.move_log().len());

        let loaded = GameController::load_game(
            &store,
            id,
            Player::human(1, "Ada".into(), 7),
            Box::new(dict()),
            config(Difficulty::Hard),
        )
        .unwrap();

        assert_eq!(
            BoardSnapshot::capture(loaded.board()),
            BoardSnapshot::capture(game.board())
        );
        assert_eq!(loaded.score(Seat::Player), 16);
        assert_eq!(loaded.score(Seat::Ai), game.score(Seat::Ai));
        assert_eq!(loaded.turn(), Seat::Player);
        assert_eq!(loaded.turn_number(), 2);
        assert_eq!(loaded.ai.difficulty(), Difficulty::Easy);
        assert_eq!(loaded.player().rack.len(), 7);
        assert_eq!(loaded.ai_player().rack.len(), 7);
        assert_eq!(loaded.bag().remaining_count(), 100 - tiles_on_board - 14);
    }

    #[test]
    fn finished_games_record_stats_once() {
        let mut game = test_game(Judge::default());
        game.player_score = 100;
        let mut store = MemoryStore::new();
        game.save_game(&mut store).unwrap();
        assert_eq!(store.player_stats(1).unwrap(), None);

        for _ in 0..3 {
            game.pass_turn().unwrap();
            game.ai_move().unwrap();
        }
        let final_score = game.score(Seat::Player);
        game.save_game(&mut store).unwrap();
        game.save_game(&mut store).unwrap();

        assert_eq!(store.game_count(), 1);
        let stats = store.player_stats(1).unwrap().unwrap();
        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.highest_score, final_score);
    }
}
