//! Legal move generation for pawns.
//!
//! Moves come out in a fixed order: origins in ascending square index, and
//! for each origin the single advance, the double advance, the capture
//! toward the a-file, then the capture toward the h-file (en passant
//! captures take the place of the diagonal they land on). The order only
//! depends on the board, which keeps seeded searches reproducible.

use crate::board::{Board, Color, Move, Square, squares};
use crate::rules::Rules;

/// Append the moves of the pawn on `from` to `out`.
fn pawn_moves(board: &Board, from: Square, side: Color, rules: &Rules, out: &mut Vec<Move>) {
    let forward = side.forward();
    let far = side.far_rank();
    let promo = |to: Square| to.rank() == far;
    let ep = board
        .en_passant_target(side)
        .filter(|_| rules.en_passant)
        .filter(|ep| {
            ep.offset(0, -forward)
                .is_some_and(|victim| board.piece_at(victim) == Some(side.opponent()))
        });

    if let Some(one) = from.offset(0, forward) {
        if board.piece_at(one).is_none() {
            out.push(Move::new(from, one, promo(one)));

            if rules.double_step && from.rank() == side.start_rank() {
                if let Some(two) = one.offset(0, forward) {
                    if board.piece_at(two).is_none() {
                        out.push(Move::new(from, two, promo(two)));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = from.offset(df, forward) else {
            continue;
        };
        match board.piece_at(to) {
            Some(color) if color != side => out.push(Move::new(from, to, promo(to))),
            None if ep == Some(to) => out.push(Move::en_passant(from, to)),
            None if rules.diagonal_into_empty => out.push(Move::new(from, to, promo(to))),
            _ => {}
        }
    }
}

/// All legal moves for `side`, regardless of whose turn the board says it is.
pub fn legal_moves(board: &Board, side: Color, rules: &Rules) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    for from in squares(board.pawns(side)) {
        pawn_moves(board, from, side, rules, &mut moves);
    }
    moves
}

/// True if `side` has at least one legal move. Stops at the first one found.
pub fn has_legal_move(board: &Board, side: Color, rules: &Rules) -> bool {
    let mut buf = Vec::with_capacity(4);
    for from in squares(board.pawns(side)) {
        pawn_moves(board, from, side, rules, &mut buf);
        if !buf.is_empty() {
            return true;
        }
    }
    false
}

/// True if `mv` removes an enemy pawn on `board`.
pub fn is_capture(board: &Board, mv: &Move) -> bool {
    if mv.en_passant {
        return true;
    }
    matches!(
        (board.piece_at(mv.from), board.piece_at(mv.to)),
        (Some(mover), Some(target)) if mover != target
    )
}
