use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::{
    bag::{seeded_rng, Tile},
    board::{Board, Coordinate, Orientation},
    judge::Dictionary,
    moves::{Move, MoveTransaction, Placement},
    player::Rack,
    rules::Difficulty,
    scoring::ScoreCalculator,
};

pub mod scoring;

use scoring::BoardScore;

pub struct Arborist {
    assessed: usize,
    prune: bool,
}
impl Arborist {
    pub fn pruning() -> Self {
        Self {
            assessed: 0,
            prune: true,
        }
    }

    pub fn exhaustive() -> Self {
        Self {
            assessed: 0,
            prune: false,
        }
    }

    pub fn assessed(&self) -> usize {
        self.assessed
    }

    fn prune(&self) -> bool {
        self.prune
    }

    fn tick(&mut self) {
        self.assessed += 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    pub search_depth: usize,
    pub max_candidates: usize,
    /// Moves explored per maximizing ply below the root.
    pub branching: usize,
    /// Dictionary words considered when generating moves.
    pub max_words: usize,
    /// Stand-in scores for the opponent's replies.
    pub opponent_replies: Vec<u32>,
}

impl AiConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            search_depth: difficulty.search_depth(),
            max_candidates: difficulty.max_candidates(),
            branching: 3,
            max_words: 200,
            opponent_replies: vec![5, 10, 15],
        }
    }
}

/// How the AI picks among its candidates, by how full the bag still is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStage {
    /// Early on, favour moves that take premium cells.
    Opening,
    Midgame,
    /// Near the end, just take the points.
    Endgame,
}

impl GameStage {
    pub fn for_tiles_remaining(tiles_remaining: usize) -> Self {
        match tiles_remaining {
            n if n > 70 => GameStage::Opening,
            n if n > 20 => GameStage::Midgame,
            _ => GameStage::Endgame,
        }
    }
}

/// What the AI consults while thinking.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub dictionary: &'a dyn Dictionary,
    pub scorer: &'a ScoreCalculator,
    pub theme: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct AiPlayer {
    difficulty: Difficulty,
    config: AiConfig,
    rng: StdRng,
}

impl AiPlayer {
    pub fn new(difficulty: Difficulty, seed: Option<u64>) -> Self {
        Self::with_config(difficulty, AiConfig::for_difficulty(difficulty), seed)
    }

    pub fn with_config(difficulty: Difficulty, config: AiConfig, seed: Option<u64>) -> Self {
        Self {
            difficulty,
            config,
            rng: seeded_rng(seed),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Picks a move for the holder of `rack`. The board and rack are used as scratch space
    /// and are handed back exactly as they came in.
    pub fn make_move(
        &mut self,
        board: &mut Board,
        rack: &mut Rack,
        ctx: SearchContext,
        tiles_remaining: usize,
    ) -> Option<Move> {
        let candidates = self.candidate_moves(board, rack, ctx);
        if candidates.is_empty() {
            debug!("No playable moves for rack {rack}");
            return None;
        }

        let stage = GameStage::for_tiles_remaining(tiles_remaining);
        debug!(
            "Choosing between {} candidates in the {stage:?} with rack {rack}",
            candidates.len()
        );

        let chosen = match stage {
            GameStage::Endgame => candidates[0].clone(),
            _ if self.difficulty == Difficulty::Easy => candidates[0].clone(),
            GameStage::Midgame => self.select(candidates, board, rack, ctx),
            GameStage::Opening => {
                let ranked = rank_positionally(candidates, board);
                self.select(ranked, board, rack, ctx)
            }
        };
        Some(chosen)
    }

    fn select(
        &mut self,
        candidates: Vec<Move>,
        board: &mut Board,
        rack: &mut Rack,
        ctx: SearchContext,
    ) -> Move {
        if candidates.len() == 1 {
            return candidates[0].clone();
        }

        match self.difficulty {
            Difficulty::Easy => candidates[0].clone(),
            Difficulty::Medium => {
                let index = match WeightedIndex::new(candidates.iter().map(|m| m.score)) {
                    Ok(weights) => weights.sample(&mut self.rng),
                    // Every candidate scores nothing
                    Err(_) => self.rng.gen_range(0..candidates.len()),
                };
                candidates[index].clone()
            }
            Difficulty::Hard => {
                let mut arborist = Arborist::pruning();
                let best = self.search(&candidates, board, rack, ctx, &mut arborist);
                debug!("Searched {} positions", arborist.assessed());
                best.unwrap_or_else(|| candidates[0].clone())
            }
        }
    }

    /// Minimax over the given candidates, returning the one with the best backed-up score.
    pub fn search(
        &self,
        candidates: &[Move],
        board: &mut Board,
        rack: &mut Rack,
        ctx: SearchContext,
        arborist: &mut Arborist,
    ) -> Option<Move> {
        let depth = self.config.search_depth.saturating_sub(1);
        let mut best_score = BoardScore::neg_inf();
        let mut best_move = None;
        let mut alpha = BoardScore::neg_inf();
        let beta = BoardScore::inf();

        for candidate in candidates.iter().take(self.config.max_candidates) {
            let transaction = MoveTransaction::begin(board, rack, candidate)
                .expect("Candidate moves should fit the board and rack they came from");
            let score = self.minimax(
                board,
                rack,
                ctx,
                depth,
                false,
                alpha.clone(),
                beta.clone(),
                arborist,
            );
            transaction.rollback(board, rack);

            if score > best_score {
                best_score = score;
                best_move = Some(candidate.clone());
            }
            if best_score > alpha {
                alpha = best_score.clone();
            }
        }

        best_move
    }

    #[allow(clippy::too_many_arguments)]
    fn minimax(
        &self,
        board: &mut Board,
        rack: &mut Rack,
        ctx: SearchContext,
        depth: usize,
        maximizing: bool,
        mut alpha: BoardScore,
        mut beta: BoardScore,
        arborist: &mut Arborist,
    ) -> BoardScore {
        arborist.tick();
        let pruning = arborist.prune();

        if depth == 0 {
            return BoardScore::of_position(board, rack);
        }

        if maximizing {
            let candidates = self.candidate_moves(board, rack, ctx);
            if candidates.is_empty() {
                return BoardScore::of_position(board, rack);
            }

            let mut max_score = BoardScore::neg_inf();
            for candidate in candidates.iter().take(self.config.branching) {
                let transaction = MoveTransaction::begin(board, rack, candidate)
                    .expect("Candidate moves should fit the board and rack they came from");
                let score = self.minimax(
                    board,
                    rack,
                    ctx,
                    depth - 1,
                    false,
                    alpha.clone(),
                    beta.clone(),
                    arborist,
                );
                transaction.rollback(board, rack);

                if score > max_score {
                    max_score = score;
                }
                if max_score > alpha {
                    alpha = max_score.clone();
                }

                if pruning && beta <= alpha {
                    break;
                }
            }

            max_score
        } else {
            // The opponent's reply lowers our outlook by a fixed amount, so the position
            // underneath is the same for every reply and only needs searching once.
            let worst = self.config.opponent_replies.iter().copied().max().unwrap_or(0) as f32;
            let outlook = self.minimax(
                board,
                rack,
                ctx,
                depth - 1,
                true,
                alpha.conceding(-worst),
                beta.conceding(-worst),
                arborist,
            );

            let mut min_score = BoardScore::inf();
            for reply in &self.config.opponent_replies {
                let score = outlook.conceding(*reply as f32);

                if score < min_score {
                    min_score = score;
                }
                if min_score < beta {
                    beta = min_score.clone();
                }

                if pruning && beta <= alpha {
                    break;
                }
            }

            min_score
        }
    }

    /// Every legal move for `rack`, best first, cut down to the difficulty's cap.
    pub fn candidate_moves(&self, board: &mut Board, rack: &Rack, ctx: SearchContext) -> Vec<Move> {
        let first_move = board.is_empty();
        let words = self.candidate_words(rack, ctx, first_move);

        let mut seeds: Vec<(Coordinate, Orientation)> = vec![];
        if first_move {
            seeds.push((board.center(), Orientation::Horizontal));
            seeds.push((board.center(), Orientation::Vertical));
        } else {
            for anchor in board.anchors() {
                seeds.push((anchor, Orientation::Horizontal));
                seeds.push((anchor, Orientation::Vertical));
            }
        }

        let mut seen: HashSet<Vec<Placement>> = HashSet::new();
        let mut moves = vec![];
        for (seed, orientation) in seeds {
            for word in &words {
                for offset in 0..word.len() {
                    let Some(start) = step_back(seed, orientation, offset) else {
                        break;
                    };
                    if let Some(mv) =
                        self.try_word(word, start, orientation, board, rack.tiles(), ctx)
                    {
                        if seen.insert(mv.placements.clone()) {
                            moves.push(mv);
                        }
                    }
                }
            }
        }

        moves.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.word.cmp(&b.word))
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.orientation.cmp(&b.orientation))
        });
        moves.truncate(self.config.max_candidates);
        moves
    }

    fn try_word(
        &self,
        word: &str,
        start: Coordinate,
        orientation: Orientation,
        board: &mut Board,
        rack: &[Tile],
        ctx: SearchContext,
    ) -> Option<Move> {
        let evaluation = ctx
            .scorer
            .evaluate_placement(word, start, orientation, rack, board);
        if !evaluation.valid {
            return None;
        }
        if evaluation.words.is_empty()
            || !evaluation
                .words
                .iter()
                .all(|w| ctx.dictionary.is_valid(&w.word, ctx.theme))
        {
            return None;
        }

        let main = evaluation
            .words
            .iter()
            .max_by_key(|w| w.word.len())
            .map(|w| w.word.clone())
            .unwrap_or_else(|| word.to_string());
        Some(Move {
            word: main,
            start,
            orientation,
            placements: evaluation.placements,
            words: evaluation.words,
            score: evaluation.score,
        })
    }

    /// Dictionary words the rack could spell, allowing one letter already on the board once play has started.
    fn candidate_words<'d>(&self, rack: &Rack, ctx: SearchContext<'d>, first_move: bool) -> Vec<&'d str> {
        let board_letters = usize::from(!first_move);
        let mut words: Vec<&str> = ctx
            .dictionary
            .words_with_length_at_most(rack.len() + board_letters)
            .into_iter()
            .filter(|w| formable(w, rack, board_letters))
            .filter(|w| ctx.dictionary.is_valid(w, ctx.theme))
            .collect();

        words.sort_by_key(|w| (Reverse(ctx.dictionary.base_points(w).unwrap_or(0)), *w));
        words.truncate(self.config.max_words);
        words
    }
}

fn step_back(seed: Coordinate, orientation: Orientation, steps: usize) -> Option<Coordinate> {
    match orientation {
        Orientation::Horizontal => seed.col.checked_sub(steps).map(|col| Coordinate::new(seed.row, col)),
        Orientation::Vertical => seed.row.checked_sub(steps).map(|row| Coordinate::new(row, seed.col)),
    }
}

/// Whether `word` can be spelled from the rack, with blanks as wildcards and up to `extra` letters found elsewhere.
fn formable(word: &str, rack: &Rack, extra: usize) -> bool {
    let mut letters: HashMap<char, usize> = HashMap::new();
    let mut blanks = 0;
    for tile in rack.iter() {
        if tile.blank {
            blanks += 1;
        } else {
            *letters.entry(tile.letter).or_insert(0) += 1;
        }
    }

    let mut extra = extra;
    for letter in word.chars().map(|c| c.to_ascii_uppercase()) {
        match letters.get_mut(&letter) {
            Some(count) if *count > 0 => *count -= 1,
            _ if blanks > 0 => blanks -= 1,
            _ if extra > 0 => extra -= 1,
            _ => return false,
        }
    }
    true
}

/// Reorders candidates so those landing on premium cells come first.
fn rank_positionally(mut candidates: Vec<Move>, board: &Board) -> Vec<Move> {
    let positional_value = |mv: &Move| -> u32 {
        let premiums: u32 = mv
            .placements
            .iter()
            .filter_map(|(position, _)| board.bonus(*position))
            .map(|bonus| {
                if bonus.is_word_bonus() {
                    3
                } else if bonus.is_letter_bonus() {
                    1
                } else {
                    0
                }
            })
            .sum();
        mv.score + premiums
    };
    candidates.sort_by_key(|mv| Reverse(positional_value(mv)));
    candidates
}
