//! Board model for the pawn-only TwoFlags variant.
//!
//! The board is two 64-bit occupancy masks (one per color) plus the side to
//! move, and the square a double step just passed over. Square indices run `a1 = 0`, `b1 = 1`, ..., `h8 = 63`, so White
//! advances toward higher indices and Black toward lower ones.

use std::fmt;
use std::str::FromStr;

use crate::constants::{FILES, N, NUM_SQUARES, PROMO_CHARS, RANKS};
use crate::error::{IllegalMove, MoveParseError, SetupError};
use crate::movegen::legal_moves;
use crate::rules::Rules;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank delta of a forward step.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Zero-based rank the pawns start on (eligible for a double step).
    pub fn start_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// Zero-based rank this color is racing toward.
    pub fn far_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Ranks of progress a pawn on `rank` has made from its back rank.
    pub fn progress(self, rank: u8) -> u8 {
        match self {
            Color::White => rank,
            Color::Black => 7 - rank,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Color::White => 'W',
            Color::Black => 'B',
        }
    }

    pub fn from_letter(c: char) -> Option<Color> {
        match c {
            'W' => Some(Color::White),
            'B' => Some(Color::Black),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }
}

/// A square on the board, always in bounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

impl Square {
    /// Build a square from zero-based file and rank.
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if (file as usize) < N && (rank as usize) < N {
            Some(Square(rank * N as u8 + file))
        } else {
            None
        }
    }

    pub fn from_index(index: usize) -> Option<Square> {
        (index < NUM_SQUARES).then_some(Square(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        self.0 % N as u8
    }

    pub fn rank(self) -> u8 {
        self.0 / N as u8
    }

    /// The square `df` files and `dr` ranks away, if it is on the board.
    pub fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let file = self.file() as i8 + df;
        let rank = self.rank() as i8 + dr;
        if file < 0 || rank < 0 {
            return None;
        }
        Square::new(file as u8, rank as u8)
    }

    pub(crate) fn bit(self) -> u64 {
        1u64 << self.0
    }

    /// Parse coordinates like `a1` or `h8`.
    pub fn parse(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = FILES.iter().position(|&c| c == bytes[0])?;
        let rank = RANKS.iter().position(|&c| c == bytes[1])?;
        Square::new(file as u8, rank as u8)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            FILES[self.file() as usize] as char,
            RANKS[self.rank() as usize] as char
        )
    }
}

/// Iterate the squares of a mask in ascending index order.
pub fn squares(mut mask: u64) -> impl Iterator<Item = Square> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let index = mask.trailing_zeros() as u8;
        mask &= mask - 1;
        Some(Square(index))
    })
}

/// A pawn move. `promotion` is set whenever the destination is the mover's far rank.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: bool,
    /// Captures the pawn that just double-stepped past `to`.
    pub en_passant: bool,
}

impl Move {
    pub fn new(from: Square, to: Square, promotion: bool) -> Move {
        Move {
            from,
            to,
            promotion,
            en_passant: false,
        }
    }

    pub fn en_passant(from: Square, to: Square) -> Move {
        Move {
            en_passant: true,
            ..Move::new(from, to, false)
        }
    }

    /// Wire notation, appending `suffix` only to promotion moves.
    pub fn notation(&self, suffix: Option<char>) -> String {
        match suffix {
            Some(c) if self.promotion => format!("{}{}{c}", self.from, self.to),
            _ => format!("{}{}", self.from, self.to),
        }
    }

    /// True if `other` names the same origin and destination.
    pub fn same_squares(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if self.promotion {
            write!(f, "{}", crate::constants::DEFAULT_PROMO_CHAR)?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    /// Accepts `a2a3` or `a7a8q` (any of `qQrRbBnN` as suffix). A suffix is
    /// only valid on a move to the first or last rank.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MoveParseError {
            text: s.to_string(),
        };
        if !s.is_ascii() {
            return Err(err());
        }
        let promotion = match s.len() {
            4 => false,
            5 if PROMO_CHARS.contains(&s.as_bytes()[4]) => true,
            _ => return Err(err()),
        };
        let from = Square::parse(&s[0..2]).ok_or_else(err)?;
        let to = Square::parse(&s[2..4]).ok_or_else(err)?;
        if promotion && to.rank() != 0 && to.rank() != N as u8 - 1 {
            return Err(err());
        }
        Ok(Move::new(from, to, promotion))
    }
}

/// Pawn placement plus the side to move.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    white: u64,
    black: u64,
    side: Color,
    /// Square skipped by the previous move's double step; valid for one ply.
    ep_target: Option<Square>,
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl Board {
    /// Eight pawns each on ranks 2 and 7, White to move.
    pub fn initial() -> Board {
        Board {
            white: 0xff << 8,
            black: 0xff << 48,
            side: Color::White,
            ep_target: None,
        }
    }

    /// A board with no pawns.
    pub fn empty(side: Color) -> Board {
        Board {
            white: 0,
            black: 0,
            side,
            ep_target: None,
        }
    }

    /// Parse `Setup` placement tokens such as `Wb4` or `Bg7`. White moves first.
    pub fn from_setup<'a, I>(tokens: I) -> Result<Board, SetupError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut board = Board::empty(Color::White);
        for token in tokens {
            let owned = || token.to_string();
            let mut chars = token.chars();
            let (Some(c), Some(_), Some(_), None) =
                (chars.next(), chars.next(), chars.next(), chars.next())
            else {
                return Err(SetupError::BadLength { token: owned() });
            };
            let color = Color::from_letter(c).ok_or_else(|| SetupError::BadColor {
                token: owned(),
            })?;
            let sq = Square::parse(&token[1..])
                .ok_or_else(|| SetupError::BadSquare { token: owned() })?;
            if board.piece_at(sq).is_some() {
                return Err(SetupError::DuplicateSquare { token: owned() });
            }
            board.put(sq, color);
        }
        Ok(board)
    }

    /// Setup tokens for every pawn, White first, each color in square order.
    pub fn setup_tokens(&self) -> Vec<String> {
        [Color::White, Color::Black]
            .into_iter()
            .flat_map(|color| {
                squares(self.pawns(color)).map(move |sq| format!("{}{sq}", color.letter()))
            })
            .collect()
    }

    pub fn side_to_move(&self) -> Color {
        self.side
    }

    /// The same placement with a different side to move.
    pub fn with_side_to_move(mut self, side: Color) -> Board {
        self.side = side;
        self.ep_target = None;
        self
    }

    /// The square `side` may capture onto en passant, if any.
    pub fn en_passant_target(&self, side: Color) -> Option<Square> {
        self.ep_target.filter(|_| side == self.side)
    }

    /// Occupancy mask of one color.
    pub fn pawns(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn occupied(&self) -> u64 {
        self.white | self.black
    }

    pub fn pawn_count(&self, color: Color) -> u32 {
        self.pawns(color).count_ones()
    }

    pub fn piece_at(&self, sq: Square) -> Option<Color> {
        if self.white & sq.bit() != 0 {
            Some(Color::White)
        } else if self.black & sq.bit() != 0 {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Place a pawn, replacing whatever stood there.
    pub fn put(&mut self, sq: Square, color: Color) {
        self.remove(sq);
        match color {
            Color::White => self.white |= sq.bit(),
            Color::Black => self.black |= sq.bit(),
        }
    }

    pub fn remove(&mut self, sq: Square) {
        self.white &= !sq.bit();
        self.black &= !sq.bit();
    }

    /// Apply `mv` for the side to move after checking it against the legal move list.
    ///
    /// The promotion marker of `mv` is not compared: `a7a8` and `a7a8q` name
    /// the same move, and the returned board records the generated one.
    pub fn apply(&self, mv: &Move, rules: &Rules) -> Result<Board, IllegalMove> {
        let legal = legal_moves(self, self.side, rules)
            .into_iter()
            .find(|m| m.same_squares(mv))
            .ok_or(IllegalMove {
                mv: *mv,
                side: self.side,
            })?;
        Ok(self.make_move(&legal))
    }

    /// Apply a move already known to be legal.
    pub(crate) fn make_move(&self, mv: &Move) -> Board {
        let forward = self.side.forward();
        let mut next = *self;
        next.ep_target = None;
        if mv.en_passant {
            if let Some(victim) = mv.to.offset(0, -forward) {
                next.remove(victim);
            }
        }
        next.remove(mv.to);
        next.remove(mv.from);
        next.put(mv.to, self.side);
        if mv.from.file() == mv.to.file() && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            next.ep_target = mv.from.offset(0, forward);
        }
        next.side = self.side.opponent();
        next
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..N as u8).rev() {
            write!(f, "{} ", RANKS[rank as usize] as char)?;
            for file in 0..N as u8 {
                let ch = match Square::new(file, rank).and_then(|sq| self.piece_at(sq)) {
                    Some(color) => color.letter(),
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "  ")?;
        for &c in FILES {
            write!(f, "{} ", c as char)?;
        }
        writeln!(f)?;
        write!(f, "to move: {:?}", self.side)?;
        if let Some(ep) = self.ep_target {
            write!(f, ", en passant {ep}")?;
        }
        Ok(())
    }
}
