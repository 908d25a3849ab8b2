//! Move-choosing strategies.
//!
//! The alpha-beta [`Searcher`] is the engine proper. The greedy and random
//! agents are cheap opponents for local self-play and for debugging a
//! server connection.

use std::time::Duration;

use crate::board::{Board, Move};
use crate::constants::GREEDY_TOP_K;
use crate::error::NoLegalMoves;
use crate::eval::evaluate;
use crate::movegen::{is_capture, legal_moves};
use crate::rules::{Rules, static_outcome};
use crate::search::{SearchResult, Searcher};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AgentKind {
    /// Iterative-deepening alpha-beta search.
    #[default]
    AlphaBeta,
    /// Winning move, else a capture, else one of the most advanced moves.
    Greedy,
    /// Any legal move.
    Random,
}

pub struct Agent {
    kind: AgentKind,
    searcher: Searcher,
}

impl Agent {
    pub fn new(kind: AgentKind, searcher: Searcher) -> Self {
        Self { kind, searcher }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn rules(&self) -> &Rules {
        self.searcher.rules()
    }

    /// Forget anything learned during the previous game.
    pub fn reset(&mut self) {
        self.searcher.clear();
    }

    /// Choose a move for the side to move on `board`.
    pub fn choose_move(
        &mut self,
        board: &Board,
        budget: Duration,
        rng: &mut fastrand::Rng,
    ) -> Result<SearchResult, NoLegalMoves> {
        match self.kind {
            AgentKind::AlphaBeta => self.searcher.choose_move(board, budget),
            AgentKind::Greedy => {
                let rules = *self.rules();
                pick(board, &rules, |moves| greedy(board, moves, rng))
            }
            AgentKind::Random => {
                let rules = *self.rules();
                pick(board, &rules, |moves| moves[rng.usize(..moves.len())])
            }
        }
    }
}

/// Shared bookkeeping for the non-searching agents.
fn pick(
    board: &Board,
    rules: &Rules,
    choose: impl FnOnce(&[Move]) -> Move,
) -> Result<SearchResult, NoLegalMoves> {
    let side = board.side_to_move();
    let moves = legal_moves(board, side, rules);
    if moves.is_empty() || static_outcome(board, rules).is_some() {
        return Err(NoLegalMoves { side });
    }
    let best_move = choose(&moves);
    Ok(SearchResult {
        best_move,
        score: evaluate(&board.make_move(&best_move), side, rules),
        depth: 0,
        nodes: 0,
        elapsed: Duration::ZERO,
    })
}

fn greedy(board: &Board, moves: &[Move], rng: &mut fastrand::Rng) -> Move {
    let winners: Vec<Move> = moves.iter().copied().filter(|m| m.promotion).collect();
    if !winners.is_empty() {
        return winners[rng.usize(..winners.len())];
    }
    let captures: Vec<Move> = moves
        .iter()
        .copied()
        .filter(|m| is_capture(board, m))
        .collect();
    if !captures.is_empty() {
        return captures[rng.usize(..captures.len())];
    }
    let side = board.side_to_move();
    let mut ranked = moves.to_vec();
    ranked.sort_by_key(|m| std::cmp::Reverse(side.progress(m.to.rank())));
    let top = ranked.len().min(GREEDY_TOP_K);
    ranked[rng.usize(..top)]
}
