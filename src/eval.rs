//! Static evaluation.
//!
//! Scores are computed from White's point of view and negated for Black, so
//! the evaluation is exactly antisymmetric between the two sides.

use crate::board::{Board, Color, Square, squares};
use crate::constants::{
    ADVANCE_WEIGHT, MOBILITY_WEIGHT, N, PASSED_WEIGHT, PAWN_VALUE, PROMOTED_VALUE, WIN_SCORE,
};
use crate::movegen::legal_moves;
use crate::rules::{Promotion, Rules, rank_mask, static_outcome};

/// Squares in front of a pawn on its own and adjacent files.
fn front_span(sq: Square, color: Color) -> u64 {
    let mut mask = 0u64;
    for step in 1..N as i8 {
        for df in -1..=1 {
            if let Some(s) = sq.offset(df, step * color.forward()) {
                mask |= s.bit();
            }
        }
    }
    mask
}

/// Material, advancement, and passed-pawn terms for one color.
fn pawn_terms(board: &Board, color: Color, rules: &Rules) -> i32 {
    let enemy = board.pawns(color.opponent());
    let promoted = board.pawns(color) & rank_mask(color.far_rank());
    let mut score = 0;
    for sq in squares(board.pawns(color)) {
        if rules.promotion == Promotion::Stays && promoted & sq.bit() != 0 {
            score += PROMOTED_VALUE;
            continue;
        }
        let progress = color.progress(sq.rank()) as i32;
        score += PAWN_VALUE + ADVANCE_WEIGHT * progress;
        if front_span(sq, color) & enemy == 0 {
            score += PASSED_WEIGHT * progress;
        }
    }
    score
}

/// Score of `board` for White.
fn evaluate_white(board: &Board, rules: &Rules) -> i32 {
    if let Some(winner) = static_outcome(board, rules) {
        return if winner == Color::White { WIN_SCORE } else { -WIN_SCORE };
    }

    let white_moves = legal_moves(board, Color::White, rules).len() as i32;
    let black_moves = legal_moves(board, Color::Black, rules).len() as i32;
    let stuck = match board.side_to_move() {
        Color::White => white_moves == 0,
        Color::Black => black_moves == 0,
    };
    if stuck {
        return match board.side_to_move() {
            Color::White => -WIN_SCORE,
            Color::Black => WIN_SCORE,
        };
    }

    pawn_terms(board, Color::White, rules) - pawn_terms(board, Color::Black, rules)
        + MOBILITY_WEIGHT * (white_moves - black_moves)
}

/// Score of `board` from `side`'s point of view; positive is good for `side`.
pub fn evaluate(board: &Board, side: Color, rules: &Rules) -> i32 {
    let score = evaluate_white(board, rules);
    match side {
        Color::White => score,
        Color::Black => -score,
    }
}
