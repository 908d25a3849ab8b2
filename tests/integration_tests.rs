//! Integration tests for twoflags
//!
//! These drive whole sessions through in-memory readers and writers, the
//! same way the binary drives them over a TCP stream.

use std::io::Cursor;
use std::time::{Duration, Instant};

use twoflags::agent::{Agent, AgentKind};
use twoflags::board::{Board, Color, Move};
use twoflags::clock::ManualClock;
use twoflags::error::SessionError;
use twoflags::movegen::legal_moves;
use twoflags::protocol::{PromoPolicy, Session, SessionConfig, State};
use twoflags::rules::{Rules, is_terminal, outcome};
use twoflags::search::Searcher;

// =============================================================================
// Helper functions
// =============================================================================

/// A session whose search stops at `depth` and never looks at the wall clock.
fn fixed_depth_session(config: SessionConfig, depth: u32) -> Session {
    let searcher = Searcher::with_clock(config.rules, Box::new(ManualClock::new(Duration::ZERO)))
        .max_depth(depth);
    Session::with_agent(config, Agent::new(config.agent, searcher))
}

/// Feed `input` to a fresh run and return what was written plus the result.
fn run_session(session: &mut Session, input: &str) -> (Vec<String>, Result<(), SessionError>) {
    let mut out = Vec::new();
    let result = session.run(Cursor::new(input.as_bytes()), &mut out);
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    (lines, result)
}

fn setup(tokens: &[&str]) -> Board {
    Board::from_setup(tokens.iter().copied()).unwrap()
}

// =============================================================================
// Session scenarios
// =============================================================================

#[test]
fn test_setup_time_begin_as_white() {
    let mut session = Session::new(SessionConfig::default());
    let input = "Setup Wb4 Wa3 Wc2 Bg7 Wd4 Bg6 Be7\nTime 1000\nBegin\n";

    let start = Instant::now();
    let (lines, result) = run_session(&mut session, input);
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    assert_eq!(lines.len(), 4, "{lines:?}");
    assert_eq!(&lines[..3], ["OK", "OK", "OK"]);
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");

    let board = setup(&["Wb4", "Wa3", "Wc2", "Bg7", "Wd4", "Bg6", "Be7"]);
    let reply: Move = lines[3].parse().unwrap();
    let legal = legal_moves(&board, Color::White, &Rules::default());
    assert!(legal.iter().any(|m| m.same_squares(&reply)), "{reply} not legal");
    assert_eq!(session.side(), Some(Color::White));
}

#[test]
fn test_opponent_move_onto_own_pawn_is_fatal() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    let input = "Setup Wa2 Wb5 Bb6 Bh7\nTime 200\nb5b6\nh7h6\n";

    let (lines, result) = run_session(&mut session, input);

    assert_eq!(lines, ["OK", "OK", "OK"]);
    assert!(matches!(
        result,
        Err(SessionError::IllegalOpponentMove { ref text }) if text == "b5b6"
    ));
    assert_eq!(session.state(), State::Terminated);
}

#[test]
fn test_malformed_setup_is_fatal() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    for bad in ["Setup Wb44", "Setup Xb4", "Setup Wz9", "Setup Wb4 Bb4"] {
        let (lines, result) = run_session(&mut session, &format!("Reset\n{bad}\n"));
        assert_eq!(lines, ["OK", "Ready"]);
        assert!(matches!(result, Err(SessionError::MalformedSetup(_))), "{bad}");
    }
}

#[test]
fn test_desync_ends_session() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    let (lines, result) = run_session(&mut session, "Setup Wa2 Bh7\nBegin\nBegin\nReset\n");

    assert_eq!(lines.len(), 3);
    assert!(matches!(result, Err(SessionError::ProtocolDesync { .. })));
    assert_eq!(session.state(), State::Terminated);
}

#[test]
fn test_unknown_and_ignored_lines_get_no_reply() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    let input = "TournamentAccepted 7\n\nHello there\nSetup Wa2 Bh7\n";
    let (lines, result) = run_session(&mut session, input);
    assert!(result.is_ok());
    assert_eq!(lines, ["OK", "OK"]);
}

#[test]
fn test_promotion_ends_the_game() {
    let board = setup(&["Wb7", "Bh7"]);
    let mv: Move = "b7b8".parse().unwrap();
    let legal = legal_moves(&board, Color::White, &Rules::default());
    let generated = legal.iter().find(|m| m.same_squares(&mv)).unwrap();
    assert!(generated.promotion);

    let after = board.apply(&mv, &Rules::default()).unwrap();
    assert!(is_terminal(&after, &Rules::default()));
    assert_eq!(outcome(&after, &Rules::default()), Some(Color::White));
}

#[test]
fn test_opponent_promotion_terminates_without_reply() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    // We are Black; White promotes at once.
    let input = "Setup Wb7 Ba7 Bh7\nTime 100\nb7b8q\nh7h6\n";
    let (lines, result) = run_session(&mut session, input);
    assert!(result.is_ok());
    assert_eq!(lines, ["OK", "OK", "OK"]);
    assert_eq!(session.state(), State::Terminated);
}

#[test]
fn test_reset_starts_a_new_game() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    let input = "Setup Wa2 Bh7\nTime 100\nBegin\nGameOver W\nReset\nSetup Wa2 Bh7\nTime 100\na2a3\n";
    let (lines, result) = run_session(&mut session, input);

    assert!(result.is_ok());
    assert_eq!(lines.len(), 8, "{lines:?}");
    assert!(lines[3].starts_with("a2"));
    assert_eq!(lines[4], "Ready");
    assert!(lines[7].starts_with("h7"));
    assert_eq!(session.side(), Some(Color::Black));
}

#[test]
fn test_next_game_after_game_over_without_reset() {
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    let input = "Setup Wa2 Bh7\nTime 50\nBegin\nGameOver W\nSetup Wa2 Bh7\nTime 50\nBegin\n";
    let (lines, result) = run_session(&mut session, input);

    assert!(result.is_ok());
    assert_eq!(lines.len(), 7, "{lines:?}");
    assert_eq!(&lines[4..6], ["OK", "OK"]);
    assert!(lines[6].starts_with("a2"));
    assert_eq!(session.state(), State::AwaitingOpponentMove);
}

#[test]
fn test_opponent_may_capture_en_passant() {
    // Our only pawn that can move is d2; e4 takes it on d3 either way.
    let mut session = fixed_depth_session(SessionConfig::default(), 2);
    let input = "Setup Wa2 Wd2 Ba3 Be4 Bh7\nTime 100\nBegin\ne4d3\n";
    let (lines, result) = run_session(&mut session, input);

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(lines.len(), 4, "{lines:?}");
    assert!(lines[3] == "d2d3" || lines[3] == "d2d4");
    let board = session.board();
    assert_eq!(board.pawn_count(Color::White), 1);
    assert_eq!(board.pawns(Color::White), setup(&["Wa2"]).pawns(Color::White));
    assert_eq!(session.state(), State::Terminated);
}

#[test]
fn test_configured_side_is_enforced() {
    let config = SessionConfig {
        side: Some(Color::White),
        ..SessionConfig::default()
    };
    let mut session = fixed_depth_session(config, 2);
    let (_, result) = run_session(&mut session, "Setup Wa2 Bh7\nTime 100\na2a3\n");
    assert!(matches!(result, Err(SessionError::ProtocolDesync { .. })));
}

#[test]
fn test_promo_suffix_on_the_wire() {
    let config = SessionConfig {
        promo: PromoPolicy::Always('Q'),
        ..SessionConfig::default()
    };
    let mut session = fixed_depth_session(config, 2);
    let (lines, _) = run_session(&mut session, "Setup Wc7 Bh7\nBegin\n");
    assert_eq!(lines.last().map(String::as_str), Some("c7c8Q"));
}

// =============================================================================
// Two sessions playing each other
// =============================================================================

/// Relay messages between two sessions until one of them stops replying.
fn play_out(white: &mut Session, black: &mut Session, setup_line: &str) -> Vec<String> {
    for session in [&mut *white, &mut *black] {
        assert_eq!(session.handle_line(setup_line).unwrap().as_deref(), Some("OK"));
        assert_eq!(session.handle_line("Time 100").unwrap().as_deref(), Some("OK"));
    }

    let mut moves = Vec::new();
    let mut pending = white.handle_line("Begin").unwrap();
    let mut to_black = true;
    while let Some(line) = pending {
        moves.push(line.clone());
        assert!(moves.len() < 300, "game did not end");
        let receiver = if to_black { &mut *black } else { &mut *white };
        pending = receiver.handle_line(&line).unwrap();
        to_black = !to_black;
    }
    moves
}

#[test]
fn test_two_sessions_play_a_full_game() {
    let mut white = fixed_depth_session(SessionConfig::default(), 2);
    let mut black = fixed_depth_session(SessionConfig::default(), 3);

    let moves = play_out(&mut white, &mut black, "Setup Wa2 Wb2 Wc2 Wd2 Bd7 Be7 Bf7 Bg7");

    assert!(!moves.is_empty());
    assert_eq!(white.state(), State::Terminated);
    assert_eq!(black.state(), State::Terminated);
    if moves.last().map(String::as_str) != Some("exit") {
        assert_eq!(white.board(), black.board());
        assert!(is_terminal(white.board(), &Rules::default()));
    }
}

#[test]
fn test_agents_against_each_other() {
    for (w, b) in [
        (AgentKind::Random, AgentKind::Greedy),
        (AgentKind::Greedy, AgentKind::AlphaBeta),
    ] {
        let mut white = fixed_depth_session(
            SessionConfig {
                agent: w,
                ..SessionConfig::default()
            },
            2,
        );
        let mut black = fixed_depth_session(
            SessionConfig {
                agent: b,
                seed: 7,
                ..SessionConfig::default()
            },
            2,
        );
        let moves = play_out(&mut white, &mut black, "Setup Wa2 Wc2 We2 Wg2 Bb7 Bd7 Bf7 Bh7");
        assert!(!moves.is_empty());
        assert_eq!(white.state(), State::Terminated);
        assert_eq!(black.state(), State::Terminated);
    }
}
