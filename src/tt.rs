//! Transposition table keyed by Zobrist hashes.

use std::collections::HashMap;

use crate::board::{Board, Color, Move, squares};
use crate::constants::{N, NUM_SQUARES, TT_CAPACITY, WIN_THRESHOLD, ZOBRIST_SEED};

/// How an entry's score relates to the true value of the position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// The search failed high: the true score is at least this.
    Lower,
    /// The search failed low: the true score is at most this.
    Upper,
}

#[derive(Copy, Clone, Debug)]
pub struct TtEntry {
    pub depth: u32,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

/// Random keys for every (color, square) pair, the side to move, and the
/// file of an en passant target.
struct Zobrist {
    pawns: [[u64; NUM_SQUARES]; 2],
    black_to_move: u64,
    ep_file: [u64; N],
}

impl Zobrist {
    fn new() -> Self {
        let mut rng = fastrand::Rng::with_seed(ZOBRIST_SEED);
        let mut pawns = [[0u64; NUM_SQUARES]; 2];
        for table in pawns.iter_mut() {
            for key in table.iter_mut() {
                *key = rng.u64(..);
            }
        }
        let black_to_move = rng.u64(..);
        let mut ep_file = [0u64; N];
        for key in ep_file.iter_mut() {
            *key = rng.u64(..);
        }
        Self {
            pawns,
            black_to_move,
            ep_file,
        }
    }
}

pub struct TranspositionTable {
    zobrist: Zobrist,
    entries: HashMap<u64, TtEntry>,
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            zobrist: Zobrist::new(),
            entries: HashMap::new(),
        }
    }

    pub fn key(&self, board: &Board) -> u64 {
        let mut key = 0u64;
        for color in [Color::White, Color::Black] {
            for sq in squares(board.pawns(color)) {
                key ^= self.zobrist.pawns[color.index()][sq.index()];
            }
        }
        if board.side_to_move() == Color::Black {
            key ^= self.zobrist.black_to_move;
        }
        if let Some(ep) = board.en_passant_target(board.side_to_move()) {
            key ^= self.zobrist.ep_file[ep.file() as usize];
        }
        key
    }

    pub fn probe(&self, key: u64) -> Option<&TtEntry> {
        self.entries.get(&key)
    }

    /// Store an entry unless a deeper one already exists for the key.
    pub fn store(&mut self, key: u64, entry: TtEntry) {
        if let Some(old) = self.entries.get(&key) {
            if old.depth > entry.depth {
                return;
            }
        }
        if self.entries.len() >= TT_CAPACITY {
            self.entries.clear();
        }
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Win scores are stored relative to the node so they stay valid at any ply.
pub fn score_to_tt(score: i32, ply: u32) -> i32 {
    if score >= WIN_THRESHOLD {
        score + ply as i32
    } else if score <= -WIN_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

pub fn score_from_tt(score: i32, ply: u32) -> i32 {
    if score >= WIN_THRESHOLD {
        score - ply as i32
    } else if score <= -WIN_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}
