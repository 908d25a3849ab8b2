//! TwoFlags: a pawn-only chess client for tournament play.
//!
//! Each side starts with eight pawns on its second rank. A side wins by
//! reaching the far rank, by capturing every enemy pawn, or when the
//! opponent has no legal move. The client connects to a game server over
//! TCP, speaks its line protocol, and answers every opponent move with the
//! best move found by an alpha-beta search within the time budget.
//!
//! ## Modules
//!
//! - [`board`] - Squares, moves, the bitboard position and its `Setup` form
//! - [`rules`] - Rule variants and win detection
//! - [`movegen`] - Legal pawn moves
//! - [`eval`] - Static evaluation
//! - [`search`] - Iterative-deepening alpha-beta with a time budget
//! - [`tt`] - Zobrist hashing and the transposition table
//! - [`clock`] - Time sources for the search deadline
//! - [`time`] - Turning `Time N` into a per-move budget
//! - [`agent`] - Alpha-beta, greedy and random move choosers
//! - [`protocol`] - The server session state machine
//! - [`error`] - Error types
//! - [`constants`] - Board dimensions and engine parameters
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use twoflags::board::Board;
//! use twoflags::rules::Rules;
//! use twoflags::search::Searcher;
//!
//! let board = Board::from_setup(["Wb6", "Bh7"]).unwrap();
//! let mut searcher = Searcher::new(Rules::default());
//! let result = searcher.choose_move(&board, Duration::from_millis(50)).unwrap();
//! println!("best move: {}", result.best_move);
//! ```

pub mod agent;
pub mod board;
pub mod clock;
pub mod constants;
pub mod error;
pub mod eval;
pub mod movegen;
pub mod protocol;
pub mod rules;
pub mod search;
pub mod time;
pub mod tt;
