//! Constants for board geometry, evaluation weights, and search parameters.
//!
//! Everything tunable about the engine lives here so that the evaluator,
//! the search, and the protocol layer agree on the same numbers.

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN). The variant is always played on a chess board.
pub const N: usize = 8;

/// Number of squares on the board.
pub const NUM_SQUARES: usize = N * N;

/// Letters used for files, `a` on the left from White's point of view.
pub const FILES: &[u8; N] = b"abcdefgh";

/// Digits used for ranks, `1` on White's side.
pub const RANKS: &[u8; N] = b"12345678";

/// Promotion letters accepted on inbound moves.
pub const PROMO_CHARS: &[u8] = b"qQrRbBnN";

/// Promotion letter appended to outbound moves unless configured otherwise.
pub const DEFAULT_PROMO_CHAR: char = 'q';

// =============================================================================
// Evaluation Weights
// =============================================================================

/// Score of a decided game. Search subtracts the ply so faster wins rank higher.
pub const WIN_SCORE: i32 = 1_000_000;

/// Any score at or beyond this magnitude is a proven win or loss.
pub const WIN_THRESHOLD: i32 = WIN_SCORE - MAX_PLY as i32;

/// Value of one pawn. Material dominates every other term.
pub const PAWN_VALUE: i32 = 100;

/// Bonus per rank of progress toward the far rank.
pub const ADVANCE_WEIGHT: i32 = 3;

/// Bonus per rank of progress for a pawn no enemy pawn can stop.
pub const PASSED_WEIGHT: i32 = 8;

/// Bonus per legal move of difference in mobility.
pub const MOBILITY_WEIGHT: i32 = 2;

/// Value of a pawn standing on its far rank when promotion does not end the game.
pub const PROMOTED_VALUE: i32 = 300;

// =============================================================================
// Search Parameters
// =============================================================================

/// Default iterative-deepening depth limit.
pub const MAX_DEPTH: u32 = 64;

/// Hard limit on search ply (used for win-score shaping).
pub const MAX_PLY: usize = 128;

/// Nodes searched between two clock polls.
pub const CHECK_INTERVAL: u64 = 256;

/// Transposition table is cleared once it grows past this many entries.
pub const TT_CAPACITY: usize = 200_000;

/// Seed for the Zobrist keys. Fixed so hashes are reproducible across runs.
pub const ZOBRIST_SEED: u64 = 1337;

/// Number of top-ranked moves the greedy agent samples from.
pub const GREEDY_TOP_K: usize = 12;

// =============================================================================
// Time Management
// =============================================================================

/// Per-move budget in milliseconds before any `Time` message arrives.
pub const DEFAULT_BUDGET_MS: u64 = 150;

/// Upper bound on the per-move safety margin, in milliseconds.
pub const SAFETY_MARGIN_MAX_MS: u64 = 50;

/// Game-clock mode: time kept in reserve, in milliseconds.
pub const CLOCK_RESERVE_MS: u64 = 50;

/// Game-clock mode: share of the remaining clock spent on one move.
pub const CLOCK_DIVISOR: u64 = 35;

/// Game-clock mode: smallest per-move budget, in milliseconds.
pub const CLOCK_MIN_BUDGET_MS: u64 = 20;

/// Game-clock mode: largest per-move budget, in milliseconds.
pub const CLOCK_MAX_BUDGET_MS: u64 = 350;

/// Game-clock mode with automatic units: values up to this are minutes.
pub const AUTO_MINUTES_THRESHOLD: u64 = 30;

/// Default seed for the session random generator.
pub const DEFAULT_SEED: u64 = 1337;
