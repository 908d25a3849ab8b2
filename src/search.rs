//! Iterative-deepening alpha-beta search with a cooperative time budget.
//!
//! The search runs negamax with alpha-beta pruning at depth 1, 2, 3, ...
//! and keeps the best move of the last iteration that finished. The clock is
//! polled before every root move and every [`CHECK_INTERVAL`] nodes; once
//! the deadline passes the running iteration is abandoned and its partial
//! result thrown away. If not even depth 1 finished, the first legal move is
//! played, so a legal answer always exists when the mover has any move.

use std::time::Duration;

use tracing::{debug, info};

use crate::board::{Board, Move};
use crate::clock::{Clock, SystemClock};
use crate::constants::{CHECK_INTERVAL, MAX_DEPTH, WIN_SCORE, WIN_THRESHOLD};
use crate::error::NoLegalMoves;
use crate::eval::evaluate;
use crate::movegen::{is_capture, legal_moves};
use crate::rules::{Rules, static_outcome};
use crate::tt::{Bound, TranspositionTable, TtEntry, score_from_tt, score_to_tt};

const INFINITY: i32 = WIN_SCORE + 1;

/// Outcome of one call to [`Searcher::choose_move`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Move,
    /// Score from the point of view of the side that moves.
    pub score: i32,
    /// Depth of the last completed iteration; 0 means the fallback move.
    pub depth: u32,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SearchResult {
    /// True if the score proves a forced win for the mover.
    pub fn is_win(&self) -> bool {
        self.score >= WIN_THRESHOLD
    }
}

/// Search state that lives across moves of a game (the transposition table).
pub struct Searcher {
    rules: Rules,
    max_depth: u32,
    clock: Box<dyn Clock>,
    tt: TranspositionTable,
    nodes: u64,
    deadline: Duration,
    stopped: bool,
}

impl Searcher {
    pub fn new(rules: Rules) -> Self {
        Self::with_clock(rules, Box::new(SystemClock::new()))
    }

    pub fn with_clock(rules: Rules, clock: Box<dyn Clock>) -> Self {
        Self {
            rules,
            max_depth: MAX_DEPTH,
            clock,
            tt: TranspositionTable::new(),
            nodes: 0,
            deadline: Duration::ZERO,
            stopped: false,
        }
    }

    /// Limit iterative deepening to `depth` plies (at least 1).
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Forget cached positions, e.g. when a new game starts.
    pub fn clear(&mut self) {
        self.tt.clear();
    }

    fn time_up(&self) -> bool {
        self.clock.now() >= self.deadline
    }

    /// Pick a move for the side to move within `budget`.
    pub fn choose_move(
        &mut self,
        board: &Board,
        budget: Duration,
    ) -> Result<SearchResult, NoLegalMoves> {
        let side = board.side_to_move();
        let start = self.clock.now();
        self.deadline = start + budget;
        self.nodes = 0;
        self.stopped = false;

        if static_outcome(board, &self.rules).is_some() {
            return Err(NoLegalMoves { side });
        }
        let mut root_moves = legal_moves(board, side, &self.rules);
        let Some(&first) = root_moves.first() else {
            return Err(NoLegalMoves { side });
        };
        order_moves(board, &mut root_moves, None);

        let mut best = SearchResult {
            best_move: first,
            score: evaluate(board, side, &self.rules),
            depth: 0,
            nodes: 0,
            elapsed: Duration::ZERO,
        };

        for depth in 1..=self.max_depth {
            if self.time_up() {
                break;
            }
            let Some((mv, score)) = self.search_root(board, &root_moves, depth) else {
                debug!(depth, nodes = self.nodes, "iteration abandoned at deadline");
                break;
            };
            best.best_move = mv;
            best.score = score;
            best.depth = depth;
            debug!(depth, score, nodes = self.nodes, best = %mv, "iteration complete");

            // Search the previous best first at the next depth.
            if let Some(pos) = root_moves.iter().position(|m| *m == mv) {
                root_moves[..=pos].rotate_right(1);
            }
            if score >= WIN_THRESHOLD {
                break;
            }
        }

        best.nodes = self.nodes;
        best.elapsed = self.clock.now().saturating_sub(start);
        info!(
            side = ?side,
            best = %best.best_move,
            score = best.score,
            depth = best.depth,
            nodes = best.nodes,
            elapsed_ms = best.elapsed.as_millis() as u64,
            "search finished"
        );
        Ok(best)
    }

    /// One full-width iteration at the root. `None` if the deadline passed.
    fn search_root(&mut self, board: &Board, moves: &[Move], depth: u32) -> Option<(Move, i32)> {
        let mut alpha = -INFINITY;
        let mut best: Option<(Move, i32)> = None;
        for mv in moves {
            if self.time_up() {
                return None;
            }
            let child = board.make_move(mv);
            let score = -self.negamax(&child, depth - 1, -INFINITY, -alpha, 1)?;
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((*mv, score));
            }
            alpha = alpha.max(score);
        }
        best
    }

    fn negamax(
        &mut self,
        board: &Board,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        ply: u32,
    ) -> Option<i32> {
        self.nodes += 1;
        if self.nodes % CHECK_INTERVAL == 0 && self.time_up() {
            self.stopped = true;
        }
        if self.stopped {
            return None;
        }

        let side = board.side_to_move();
        let win = WIN_SCORE - ply as i32;
        if let Some(winner) = static_outcome(board, &self.rules) {
            return Some(if winner == side { win } else { -win });
        }
        let mut moves = legal_moves(board, side, &self.rules);
        if moves.is_empty() {
            return Some(-win);
        }
        if depth == 0 {
            return Some(evaluate(board, side, &self.rules));
        }

        let key = self.tt.key(board);
        let mut tt_move = None;
        if let Some(entry) = self.tt.probe(key) {
            tt_move = entry.best_move;
            if entry.depth >= depth {
                let score = score_from_tt(entry.score, ply);
                match entry.bound {
                    Bound::Exact => return Some(score),
                    Bound::Lower => alpha = alpha.max(score),
                    Bound::Upper => beta = beta.min(score),
                }
                if alpha >= beta {
                    return Some(score);
                }
            }
        }

        order_moves(board, &mut moves, tt_move);

        let alpha_orig = alpha;
        let mut best_score = -INFINITY;
        let mut best_move = None;
        for mv in &moves {
            let child = board.make_move(mv);
            let score = -self.negamax(&child, depth - 1, -beta, -alpha, ply + 1)?;
            if score > best_score {
                best_score = score;
                best_move = Some(*mv);
            }
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        let bound = if best_score <= alpha_orig {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.tt.store(
            key,
            TtEntry {
                depth,
                score: score_to_tt(best_score, ply),
                bound,
                best_move,
            },
        );
        Some(best_score)
    }
}

/// Hash move first, then promotions, then captures, then quiet moves.
/// The sort is stable, so generator order breaks ties.
fn order_moves(board: &Board, moves: &mut [Move], tt_move: Option<Move>) {
    moves.sort_by_key(|mv| {
        if Some(*mv) == tt_move {
            0
        } else if mv.promotion {
            1
        } else if is_capture(board, mv) {
            2
        } else {
            3
        }
    });
}
