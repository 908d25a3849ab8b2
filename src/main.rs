//! TwoFlags: a pawn-only chess client.
//!
//! ## Usage
//!
//! - `twoflags connect <HOST> <PORT>` - Play a game on a tournament server
//! - `twoflags selfplay` - Play a local game between two agents

use std::io::BufReader;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use twoflags::agent::{Agent, AgentKind};
use twoflags::board::{Board, Color};
use twoflags::constants::{DEFAULT_BUDGET_MS, DEFAULT_SEED, MAX_DEPTH};
use twoflags::protocol::{PromoPolicy, Session, SessionConfig};
use twoflags::rules::{Promotion, Rules, outcome};
use twoflags::search::Searcher;
use twoflags::time::{TimeMode, TimeUnit};

/// TwoFlags: a pawn-only chess client
#[derive(Parser)]
#[command(name = "twoflags")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a game server and play
    Connect {
        host: String,
        port: u16,

        /// Our color; `auto` learns it from the server
        #[arg(long, value_enum, default_value_t = SideArg::Auto)]
        side: SideArg,

        /// Meaning of the server's `Time N`
        #[arg(long, value_enum, default_value_t = TimeModeArg::PerMove)]
        time_mode: TimeModeArg,

        /// Unit of `N` in game-clock mode
        #[arg(long, value_enum, default_value_t = TimeUnitArg::Auto)]
        time_unit: TimeUnitArg,

        /// Suffix appended to our promotion moves
        #[arg(long, value_enum, default_value_t = PromoArg::Auto)]
        promo: PromoArg,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Play a local game between two agents and print every move
    Selfplay {
        /// Starting position as setup tokens, e.g. "Wb4 Wa3 Bg7"
        #[arg(long)]
        setup: Option<String>,

        /// Agent playing Black (`--agent` plays White)
        #[arg(long, value_enum, default_value_t = AgentArg::Ab)]
        opponent: AgentArg,

        /// Search budget per move, in milliseconds
        #[arg(long, default_value_t = DEFAULT_BUDGET_MS)]
        budget_ms: u64,

        /// Stop after this many plies without a result
        #[arg(long, default_value_t = 200)]
        max_plies: u32,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Options shared by both subcommands.
#[derive(Args)]
struct EngineArgs {
    #[arg(long, value_enum, default_value_t = AgentArg::Ab)]
    agent: AgentArg,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = MAX_DEPTH)]
    max_depth: u32,

    /// Allow diagonal moves onto empty squares
    #[arg(long)]
    diag_empty: bool,

    /// Disallow the two-square first move
    #[arg(long)]
    no_double_step: bool,

    /// Disallow capturing a double-stepped pawn en passant
    #[arg(long)]
    no_en_passant: bool,

    /// What reaching the far rank does
    #[arg(long, value_enum, default_value_t = PromotionArg::Wins)]
    promotion: PromotionArg,
}

impl EngineArgs {
    fn rules(&self) -> Rules {
        Rules {
            double_step: !self.no_double_step,
            diagonal_into_empty: self.diag_empty,
            en_passant: !self.no_en_passant,
            promotion: match self.promotion {
                PromotionArg::Wins => Promotion::Wins,
                PromotionArg::Stays => Promotion::Stays,
            },
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SideArg {
    W,
    B,
    Auto,
}

#[derive(Copy, Clone, ValueEnum)]
enum AgentArg {
    Ab,
    Greedy,
    Random,
}

impl From<AgentArg> for AgentKind {
    fn from(arg: AgentArg) -> Self {
        match arg {
            AgentArg::Ab => AgentKind::AlphaBeta,
            AgentArg::Greedy => AgentKind::Greedy,
            AgentArg::Random => AgentKind::Random,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum TimeModeArg {
    PerMove,
    Game,
}

#[derive(Copy, Clone, ValueEnum)]
enum TimeUnitArg {
    Auto,
    Sec,
    Min,
}

#[derive(Copy, Clone, ValueEnum)]
enum PromoArg {
    Auto,
    Off,
    #[value(name = "q")]
    Lower,
    #[value(name = "Q")]
    Upper,
}

#[derive(Copy, Clone, ValueEnum)]
enum PromotionArg {
    Wins,
    Stays,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Connect {
            host,
            port,
            side,
            time_mode,
            time_unit,
            promo,
            engine,
        } => {
            let unit = match time_unit {
                TimeUnitArg::Auto => TimeUnit::Auto,
                TimeUnitArg::Sec => TimeUnit::Seconds,
                TimeUnitArg::Min => TimeUnit::Minutes,
            };
            let config = SessionConfig {
                side: match side {
                    SideArg::W => Some(Color::White),
                    SideArg::B => Some(Color::Black),
                    SideArg::Auto => None,
                },
                seed: engine.seed,
                agent: engine.agent.into(),
                max_depth: engine.max_depth,
                time_mode: match time_mode {
                    TimeModeArg::PerMove => TimeMode::PerMove,
                    TimeModeArg::Game => TimeMode::GameClock(unit),
                },
                promo: match promo {
                    PromoArg::Auto => PromoPolicy::Auto,
                    PromoArg::Off => PromoPolicy::Off,
                    PromoArg::Lower => PromoPolicy::Always('q'),
                    PromoArg::Upper => PromoPolicy::Always('Q'),
                },
                rules: engine.rules(),
            };
            connect(&host, port, config)
        }
        Commands::Selfplay {
            setup,
            opponent,
            budget_ms,
            max_plies,
            engine,
        } => selfplay(
            setup.as_deref(),
            [engine.agent.into(), opponent.into()],
            &engine,
            Duration::from_millis(budget_ms),
            max_plies,
        ),
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn connect(host: &str, port: u16, config: SessionConfig) -> anyhow::Result<()> {
    let stream = TcpStream::connect((host, port))
        .with_context(|| format!("failed to connect to {host}:{port}"))?;
    info!("connected to {host}:{port}");

    let reader = BufReader::new(stream.try_clone().context("failed to clone the connection")?);
    let mut session = Session::new(config);
    let result = session.run(reader, &stream);

    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!("shutdown: {e}");
    }
    result.context("session aborted")
}

fn selfplay(
    setup: Option<&str>,
    kinds: [AgentKind; 2],
    engine: &EngineArgs,
    budget: Duration,
    max_plies: u32,
) -> anyhow::Result<()> {
    let rules = engine.rules();
    let mut board = match setup {
        Some(tokens) => Board::from_setup(tokens.split_whitespace()).context("invalid --setup")?,
        None => Board::initial(),
    };
    let mut rng = fastrand::Rng::with_seed(engine.seed);
    let mut agents = kinds.map(|kind| {
        Agent::new(kind, Searcher::new(rules).max_depth(engine.max_depth))
    });

    println!("White: {:?}, Black: {:?}", agents[0].kind(), agents[1].kind());
    println!("{board}");
    for ply in 1..=max_plies {
        if let Some(winner) = outcome(&board, &rules) {
            println!("{winner:?} wins after {} plies", ply - 1);
            return Ok(());
        }
        let side = board.side_to_move();
        let agent = match side {
            Color::White => &mut agents[0],
            Color::Black => &mut agents[1],
        };
        let result = agent.choose_move(&board, budget, &mut rng)?;
        board = board.apply(&result.best_move, &rules)?;
        println!(
            "{ply}. {side:?} {} (depth {}, score {}, {} nodes)",
            result.best_move, result.depth, result.score, result.nodes
        );
        println!("{board}");
    }
    if let Some(winner) = outcome(&board, &rules) {
        println!("{winner:?} wins after {max_plies} plies");
    } else {
        println!("no result after {max_plies} plies");
    }
    Ok(())
}
