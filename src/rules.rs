//! Variant switches and the terminal-position predicate.
//!
//! TwoFlags is decided by one of three events: a pawn planted on the far
//! rank (the "flag"), a side losing its last pawn, or the side to move having
//! no legal move. Which pawn steps are legal and whether the far rank ends
//! the game are configurable through [`Rules`].

use crate::board::{Board, Color};
use crate::movegen::has_legal_move;

/// What happens when a pawn reaches its far rank.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Promotion {
    /// The pawn's owner wins immediately.
    #[default]
    Wins,
    /// The pawn stays on the far rank as an inert promoted pawn; play continues.
    Stays,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rules {
    /// Pawns on their start rank may advance two squares.
    pub double_step: bool,
    /// Pawns may step diagonally into an empty square.
    pub diagonal_into_empty: bool,
    /// A pawn may capture one that just double-stepped past it.
    pub en_passant: bool,
    pub promotion: Promotion,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            double_step: true,
            diagonal_into_empty: false,
            en_passant: true,
            promotion: Promotion::Wins,
        }
    }
}

/// Mask of a whole rank (zero-based).
pub(crate) fn rank_mask(rank: u8) -> u64 {
    0xffu64 << (rank as u32 * 8)
}

/// Winner decided by material or flags alone, without generating moves.
pub(crate) fn static_outcome(board: &Board, rules: &Rules) -> Option<Color> {
    if rules.promotion == Promotion::Wins {
        // White is checked first; play stops as soon as either flag is taken.
        for color in [Color::White, Color::Black] {
            if board.pawns(color) & rank_mask(color.far_rank()) != 0 {
                return Some(color);
            }
        }
    }
    for color in [Color::White, Color::Black] {
        if board.pawns(color) == 0 {
            return Some(color.opponent());
        }
    }
    None
}

/// The winner, if the game is over.
pub fn outcome(board: &Board, rules: &Rules) -> Option<Color> {
    if let Some(winner) = static_outcome(board, rules) {
        return Some(winner);
    }
    let side = board.side_to_move();
    if !has_legal_move(board, side, rules) {
        return Some(side.opponent());
    }
    None
}

pub fn is_terminal(board: &Board, rules: &Rules) -> bool {
    outcome(board, rules).is_some()
}
