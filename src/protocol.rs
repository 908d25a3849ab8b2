//! TwoFlags tournament protocol.
//!
//! The server drives the game with one message per line. Setup-phase
//! messages are acknowledged with `OK`; `Begin` and opponent moves are
//! answered with our move. Every inbound line yields at most one outbound
//! line, written before the next inbound line is read.
//!
//! ## Messages
//!
//! - `Setup Wb4 Wa3 ... Be7` - replace the board, reply `OK`
//! - `Time N` - record the time budget, reply `OK`
//! - `Begin` - we are White and move first
//! - `a2a3`, `a7a8q` - the opponent's move; reply with ours
//! - `Reset` - start over, reply `Ready`
//! - `exit`, `GameOver ...` - the game is over; a later `Setup` or `Time`
//!   starts the next game
//! - `TournamentAccepted ...` - ignored
//!
//! ## Example
//!
//! ```
//! use twoflags::protocol::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//! assert_eq!(session.handle_line("Setup Wb4 Bg7").unwrap().as_deref(), Some("OK"));
//! assert_eq!(session.handle_line("Time 50").unwrap().as_deref(), Some("OK"));
//! let reply = session.handle_line("Begin").unwrap();
//! assert!(reply.is_some());
//! ```

use std::io::{BufRead, Write};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::agent::{Agent, AgentKind};
use crate::board::{Board, Color, Move};
use crate::constants::{DEFAULT_PROMO_CHAR, DEFAULT_SEED, MAX_DEPTH};
use crate::error::{SessionError, SessionResult};
use crate::rules::{Rules, outcome};
use crate::search::Searcher;
use crate::time::{TimeControl, TimeMode};

/// Suffix policy for our promotion moves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PromoPolicy {
    /// Append `q` once the server has sent a move with a suffix.
    #[default]
    Auto,
    Off,
    Always(char),
}

/// Everything the session needs that comes from outside the protocol.
#[derive(Copy, Clone, Debug)]
pub struct SessionConfig {
    /// Our color, or `None` to infer it from `Begin` or the first opponent move.
    pub side: Option<Color>,
    pub seed: u64,
    pub agent: AgentKind,
    pub max_depth: u32,
    pub time_mode: TimeMode,
    pub promo: PromoPolicy,
    pub rules: Rules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            side: None,
            seed: DEFAULT_SEED,
            agent: AgentKind::AlphaBeta,
            max_depth: MAX_DEPTH,
            time_mode: TimeMode::PerMove,
            promo: PromoPolicy::Auto,
            rules: Rules::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    AwaitingSetup,
    AwaitingTime,
    AwaitingBegin,
    AwaitingOpponentMove,
    Terminated,
}

/// One parsed inbound line.
#[derive(Debug)]
enum Message<'a> {
    Setup(Vec<&'a str>),
    Time(Option<&'a str>),
    Begin,
    Move(Move),
    Reset,
    GameEnd,
    Ignored,
    Unknown,
}

impl<'a> Message<'a> {
    fn parse(line: &'a str) -> Message<'a> {
        let mut words = line.split_whitespace();
        match words.next() {
            None => Message::Ignored,
            Some("Setup") => Message::Setup(words.collect()),
            Some("Time") => Message::Time(words.next()),
            Some("Begin") => Message::Begin,
            Some("Reset") => Message::Reset,
            Some("exit") => Message::GameEnd,
            Some(w) if w.starts_with("GameOver") => Message::GameEnd,
            Some(w) if w.starts_with("TournamentAccepted") => Message::Ignored,
            Some(w) => match w.parse() {
                Ok(mv) => Message::Move(mv),
                Err(_) => Message::Unknown,
            },
        }
    }
}

/// Protocol state for one server connection.
pub struct Session {
    config: SessionConfig,
    board: Board,
    side: Option<Color>,
    state: State,
    time: TimeControl,
    agent: Agent,
    rng: fastrand::Rng,
    server_uses_promo: bool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let searcher = Searcher::new(config.rules).max_depth(config.max_depth);
        Self::with_agent(config, Agent::new(config.agent, searcher))
    }

    /// Create a session around a prepared agent (e.g. one with a test clock).
    pub fn with_agent(config: SessionConfig, agent: Agent) -> Self {
        Self {
            config,
            board: Board::initial(),
            side: config.side,
            state: State::AwaitingSetup,
            time: TimeControl::new(config.time_mode),
            agent,
            rng: fastrand::Rng::with_seed(config.seed),
            server_uses_promo: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Our color, once known.
    pub fn side(&self) -> Option<Color> {
        self.side
    }

    fn rules(&self) -> Rules {
        self.config.rules
    }

    /// Read lines until the server disconnects, answering each in turn.
    ///
    /// Sends the initial `OK` greeting first. A fatal error is logged and
    /// returned; the caller owns the connection and closes it.
    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> SessionResult<()> {
        send(&mut writer, "OK")?;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                info!("server disconnected");
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            debug!("<- {line}");

            match self.handle_line(line) {
                Ok(Some(reply)) => send(&mut writer, &reply)?,
                Ok(None) => {}
                Err(e) => {
                    error!(state = ?self.state, "{e}");
                    self.state = State::Terminated;
                    return Err(e);
                }
            }
        }
    }

    /// Process one inbound line and return the reply to send, if any.
    pub fn handle_line(&mut self, line: &str) -> SessionResult<Option<String>> {
        let message = Message::parse(line);
        match message {
            Message::Ignored => return Ok(None),
            Message::Unknown => {
                warn!("unhandled server message: {line:?}");
                return Ok(None);
            }
            Message::Reset => {
                self.reset();
                return Ok(Some("Ready".to_string()));
            }
            Message::Setup(_) | Message::Time(_) if self.state == State::Terminated => {
                info!("next game starts without Reset");
                self.new_game();
            }
            Message::Begin if self.state == State::Terminated => {
                return Err(SessionError::desync("Begin before the next Setup", line));
            }
            _ if self.state == State::Terminated => {
                debug!("game over, ignoring {line:?}");
                return Ok(None);
            }
            _ => {}
        }

        match message {
            Message::GameEnd => {
                info!("game ended by server: {line}");
                self.state = State::Terminated;
                Ok(None)
            }
            Message::Setup(tokens) => self.on_setup(&tokens, line),
            Message::Time(arg) => self.on_time(arg, line),
            Message::Begin => self.on_begin(line),
            Message::Move(mv) => self.on_opponent_move(mv, line),
            Message::Ignored | Message::Unknown | Message::Reset => Ok(None),
        }
    }

    fn reset(&mut self) {
        info!("reset");
        self.new_game();
    }

    /// Forget the board, side, clock and search state of the last game.
    fn new_game(&mut self) {
        self.board = Board::initial();
        self.side = self.config.side;
        self.state = State::AwaitingSetup;
        self.time.reset();
        self.agent.reset();
    }

    fn on_setup(&mut self, tokens: &[&str], line: &str) -> SessionResult<Option<String>> {
        match self.state {
            State::AwaitingSetup | State::AwaitingTime | State::AwaitingBegin => {}
            _ => return Err(SessionError::desync("setup during play", line)),
        }
        self.board = Board::from_setup(tokens.iter().copied())?;
        info!("setup: {} pawns", tokens.len());
        debug!("\n{}", self.board);
        if self.state == State::AwaitingSetup {
            self.state = State::AwaitingTime;
        }
        Ok(Some("OK".to_string()))
    }

    fn on_time(&mut self, arg: Option<&str>, line: &str) -> SessionResult<Option<String>> {
        let n: u64 = arg
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| SessionError::desync("Time needs a non-negative integer", line))?;
        self.time.set(n);
        info!(budget_ms = self.time.budget().as_millis() as u64, "time control: {n}");
        if self.state != State::AwaitingOpponentMove {
            self.state = State::AwaitingBegin;
        }
        Ok(Some("OK".to_string()))
    }

    /// Opening moves are accepted once the board is set up; `Time` is optional.
    fn expecting_first_move(&self) -> bool {
        matches!(self.state, State::AwaitingTime | State::AwaitingBegin)
    }

    fn on_begin(&mut self, line: &str) -> SessionResult<Option<String>> {
        if !self.expecting_first_move() {
            return Err(SessionError::desync("unexpected Begin", line));
        }
        if self.side == Some(Color::Black) {
            return Err(SessionError::desync("told to begin but we play Black", line));
        }
        if self.board.side_to_move() != Color::White {
            return Err(SessionError::desync("told to begin but White is not to move", line));
        }
        self.side = Some(Color::White);
        info!("playing White");
        Ok(Some(self.reply_move()))
    }

    fn on_opponent_move(&mut self, mv: Move, line: &str) -> SessionResult<Option<String>> {
        if self.expecting_first_move() {
            if self.side == Some(Color::White) {
                return Err(SessionError::desync("opponent moved before Begin", line));
            }
            self.side = Some(Color::Black);
            info!("playing Black");
        } else if self.state != State::AwaitingOpponentMove {
            return Err(SessionError::desync("move before setup", line));
        }

        let ours = self.side.unwrap_or(Color::Black);
        if self.board.side_to_move() != ours.opponent() {
            return Err(SessionError::desync("opponent moved out of turn", line));
        }

        if mv.promotion && mv.to.rank() == ours.opponent().far_rank() {
            self.server_uses_promo = true;
        }
        self.board = self
            .board
            .apply(&mv, &self.rules())
            .map_err(|e| {
                warn!("{e}\n{}", self.board);
                SessionError::IllegalOpponentMove {
                    text: line.to_string(),
                }
            })?;
        debug!("opponent played {mv}");

        if let Some(winner) = outcome(&self.board, &self.rules()) {
            info!(winner = ?winner, "game over after opponent move");
            self.state = State::Terminated;
            return Ok(None);
        }
        Ok(Some(self.reply_move()))
    }

    /// Search, play, and return the notation of our move (`exit` if we have none).
    fn reply_move(&mut self) -> String {
        let started = Instant::now();
        let budget = self.time.budget();
        let result = self.agent.choose_move(&self.board, budget, &mut self.rng);
        self.time.spend(started.elapsed());

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!("{e}; resigning");
                self.state = State::Terminated;
                return "exit".to_string();
            }
        };

        self.board = self.board.make_move(&result.best_move);
        if let Some(winner) = outcome(&self.board, &self.rules()) {
            info!(winner = ?winner, "game over after our move");
            self.state = State::Terminated;
        } else {
            self.state = State::AwaitingOpponentMove;
        }
        result.best_move.notation(self.promo_suffix())
    }

    fn promo_suffix(&self) -> Option<char> {
        match self.config.promo {
            PromoPolicy::Off => None,
            PromoPolicy::Always(c) => Some(c),
            PromoPolicy::Auto => self.server_uses_promo.then_some(DEFAULT_PROMO_CHAR),
        }
    }
}

fn send<W: Write>(writer: &mut W, line: &str) -> SessionResult<()> {
    debug!("-> {line}");
    writeln!(writer, "{line}")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::clock::ManualClock;
    use crate::rules::Promotion;

    /// A session whose search is bounded by depth only.
    fn session(config: SessionConfig) -> Session {
        let clock = ManualClock::new(Duration::ZERO);
        let searcher = Searcher::with_clock(config.rules, Box::new(clock)).max_depth(3);
        Session::with_agent(config, Agent::new(config.agent, searcher))
    }

    fn reply(session: &mut Session, line: &str) -> Option<String> {
        session.handle_line(line).unwrap()
    }

    #[test]
    fn test_message_parse() {
        assert!(matches!(Message::parse("Setup Wa2 Bb7"), Message::Setup(t) if t == ["Wa2", "Bb7"]));
        assert!(matches!(Message::parse("Time 5"), Message::Time(Some("5"))));
        assert!(matches!(Message::parse("Time"), Message::Time(None)));
        assert!(matches!(Message::parse("Begin"), Message::Begin));
        assert!(matches!(Message::parse("e7e6"), Message::Move(_)));
        assert!(matches!(Message::parse("GameOver W"), Message::GameEnd));
        assert!(matches!(Message::parse("exit"), Message::GameEnd));
        assert!(matches!(Message::parse("TournamentAccepted 3"), Message::Ignored));
        assert!(matches!(Message::parse(""), Message::Ignored));
        assert!(matches!(Message::parse("IllegalMove"), Message::Unknown));
    }

    #[test]
    fn test_setup_time_begin() {
        let mut s = session(SessionConfig::default());
        assert_eq!(s.state(), State::AwaitingSetup);
        assert_eq!(reply(&mut s, "Setup Wb4 Bg7").as_deref(), Some("OK"));
        assert_eq!(s.state(), State::AwaitingTime);
        assert_eq!(reply(&mut s, "Time 100").as_deref(), Some("OK"));
        assert_eq!(s.state(), State::AwaitingBegin);
        let mv = reply(&mut s, "Begin").unwrap();
        assert!(mv.starts_with("b4"));
        assert_eq!(s.side(), Some(Color::White));
        assert_eq!(s.state(), State::AwaitingOpponentMove);
        assert_eq!(s.board().side_to_move(), Color::Black);
    }

    #[test]
    fn test_opening_move_makes_us_black() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Bh7");
        reply(&mut s, "Time 100");
        let mv = reply(&mut s, "a2a3").unwrap();
        assert_eq!(s.side(), Some(Color::Black));
        assert!(mv.starts_with("h7"));
    }

    #[test]
    fn test_setup_error_is_fatal() {
        let mut s = session(SessionConfig::default());
        assert!(matches!(
            s.handle_line("Setup Wb4 Zg7"),
            Err(SessionError::MalformedSetup(_))
        ));
    }

    #[test]
    fn test_bad_time_is_desync() {
        let mut s = session(SessionConfig::default());
        assert!(matches!(
            s.handle_line("Time soon"),
            Err(SessionError::ProtocolDesync { .. })
        ));
    }

    #[test]
    fn test_out_of_state_messages() {
        let mut s = session(SessionConfig::default());
        assert!(matches!(
            s.handle_line("Begin"),
            Err(SessionError::ProtocolDesync { .. })
        ));

        let mut s = session(SessionConfig::default());
        assert!(matches!(
            s.handle_line("a2a3"),
            Err(SessionError::ProtocolDesync { .. })
        ));

        let mut s = session(SessionConfig {
            side: Some(Color::Black),
            ..SessionConfig::default()
        });
        reply(&mut s, "Setup Wa2 Bh7");
        assert!(matches!(
            s.handle_line("Begin"),
            Err(SessionError::ProtocolDesync { .. })
        ));

        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Bh7");
        reply(&mut s, "Begin");
        assert!(matches!(
            s.handle_line("Begin"),
            Err(SessionError::ProtocolDesync { .. })
        ));
    }

    #[test]
    fn test_illegal_opponent_move() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Wb3 Bh7");
        reply(&mut s, "Time 100");
        reply(&mut s, "Begin");
        let before = *s.board();
        assert!(matches!(
            s.handle_line("h7g6"),
            Err(SessionError::IllegalOpponentMove { .. })
        ));
        assert_eq!(*s.board(), before);
    }

    #[test]
    fn test_reset_and_game_end() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Bh7");
        reply(&mut s, "Begin");
        assert_eq!(reply(&mut s, "GameOver W"), None);
        assert_eq!(s.state(), State::Terminated);
        assert_eq!(reply(&mut s, "h7h6"), None);
        assert_eq!(reply(&mut s, "Reset").as_deref(), Some("Ready"));
        assert_eq!(s.state(), State::AwaitingSetup);
        assert_eq!(s.side(), None);
        assert_eq!(*s.board(), Board::initial());
    }

    #[test]
    fn test_no_moves_sends_exit() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa4 Ba5 Bh7");
        assert_eq!(reply(&mut s, "Begin").as_deref(), Some("exit"));
        assert_eq!(s.state(), State::Terminated);
    }

    #[test]
    fn test_promotion_suffix_policy() {
        let winning = "Setup Wb7 Bh7";

        let mut s = session(SessionConfig::default());
        reply(&mut s, winning);
        assert_eq!(reply(&mut s, "Begin").as_deref(), Some("b7b8"));
        assert_eq!(s.state(), State::Terminated);

        let mut s = session(SessionConfig {
            promo: PromoPolicy::Always('Q'),
            ..SessionConfig::default()
        });
        reply(&mut s, winning);
        assert_eq!(reply(&mut s, "Begin").as_deref(), Some("b7b8Q"));

        let mut s = session(SessionConfig {
            promo: PromoPolicy::Off,
            ..SessionConfig::default()
        });
        reply(&mut s, winning);
        assert_eq!(reply(&mut s, "Begin").as_deref(), Some("b7b8"));
    }

    #[test]
    fn test_auto_promo_after_server_promotion() {
        let config = SessionConfig {
            rules: Rules {
                promotion: Promotion::Stays,
                ..Rules::default()
            },
            ..SessionConfig::default()
        };
        // Black's only move is c2c1 once White has promoted on a8.
        let position = "Setup Wa7 Wh4 Bc2 Bh5";

        let mut s = session(config);
        reply(&mut s, position);
        assert_eq!(reply(&mut s, "a7a8").as_deref(), Some("c2c1"));

        let mut s = session(config);
        reply(&mut s, position);
        assert_eq!(reply(&mut s, "a7a8q").as_deref(), Some("c2c1q"));
    }

    #[test]
    fn test_suffix_on_ordinary_move_is_not_a_move() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa6 Bc2 Bh5");
        assert_eq!(reply(&mut s, "a6a7q"), None);
        assert_eq!(s.state(), State::AwaitingTime);
        assert_eq!(s.side(), None);
    }

    #[test]
    fn test_setup_after_game_over_starts_next_game() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Bh7");
        reply(&mut s, "Time 50");
        assert!(reply(&mut s, "Begin").is_some());
        assert_eq!(reply(&mut s, "GameOver W"), None);
        assert_eq!(s.state(), State::Terminated);

        assert_eq!(reply(&mut s, "Setup Wa2 Bh7").as_deref(), Some("OK"));
        assert_eq!(s.side(), None);
        assert_eq!(reply(&mut s, "Time 50").as_deref(), Some("OK"));
        let mv = reply(&mut s, "Begin").unwrap();
        assert!(mv.starts_with("a2"));
        assert_eq!(s.state(), State::AwaitingOpponentMove);
    }

    #[test]
    fn test_time_after_game_over_starts_next_game() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Bh7");
        reply(&mut s, "Begin");
        reply(&mut s, "exit");
        assert_eq!(reply(&mut s, "Time 50").as_deref(), Some("OK"));
        assert_eq!(*s.board(), Board::initial());
        assert_eq!(reply(&mut s, "Setup Wb2 Bg7").as_deref(), Some("OK"));
        assert_eq!(s.state(), State::AwaitingBegin);
    }

    #[test]
    fn test_begin_after_game_over_is_desync() {
        let mut s = session(SessionConfig::default());
        reply(&mut s, "Setup Wa2 Bh7");
        reply(&mut s, "Begin");
        reply(&mut s, "GameOver B");
        assert!(matches!(
            s.handle_line("Begin"),
            Err(SessionError::ProtocolDesync { .. })
        ));
    }

    #[test]
    fn test_run_writes_greeting_and_replies() {
        let mut s = session(SessionConfig::default());
        let input = "Setup Wb4 Bg7\nTime 100\nTournamentAccepted\n";
        let mut out = Vec::new();
        s.run(input.as_bytes(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "OK\nOK\nOK\n");
    }
}
