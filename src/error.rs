//! Error types for board parsing, move validation, search, and the session.

use crate::board::{Color, Move};

/// A `Setup` token that could not be turned into a pawn placement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("setup token {token:?} must be exactly 3 characters")]
    BadLength { token: String },

    #[error("setup token {token:?} has an invalid color letter")]
    BadColor { token: String },

    #[error("setup token {token:?} names a square off the board")]
    BadSquare { token: String },

    #[error("setup token {token:?} places a second pawn on the same square")]
    DuplicateSquare { token: String },
}

/// Text that is not a move in `<src><dst>[promo]` notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad move notation: {text:?}")]
pub struct MoveParseError {
    pub text: String,
}

/// A move that is not a legal transition for the side to move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal move {mv} for {side:?}")]
pub struct IllegalMove {
    pub mv: Move,
    pub side: Color,
}

/// Search was asked for a move in a position where the mover has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no legal moves for {side:?}")]
pub struct NoLegalMoves {
    pub side: Color,
}

/// Fatal conditions that end a protocol session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed setup: {0}")]
    MalformedSetup(#[from] SetupError),

    #[error("illegal opponent move {text:?}")]
    IllegalOpponentMove { text: String },

    #[error("protocol desync: {message} (got {line:?})")]
    ProtocolDesync { message: String, line: String },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub(crate) fn desync(message: impl Into<String>, line: &str) -> Self {
        SessionError::ProtocolDesync {
            message: message.into(),
            line: line.to_string(),
        }
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
