//! Turning the server's `Time N` message into a per-move search budget.

use std::time::Duration;

use crate::constants::{
    AUTO_MINUTES_THRESHOLD, CLOCK_DIVISOR, CLOCK_MAX_BUDGET_MS, CLOCK_MIN_BUDGET_MS,
    CLOCK_RESERVE_MS, DEFAULT_BUDGET_MS, SAFETY_MARGIN_MAX_MS,
};

/// Unit of `N` when it describes the whole game clock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TimeUnit {
    /// Small values are minutes, larger ones seconds.
    #[default]
    Auto,
    Seconds,
    Minutes,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TimeMode {
    /// `N` is the budget for each move, in milliseconds.
    #[default]
    PerMove,
    /// `N` is the total time for the game; each move gets a slice of what is left.
    GameClock(TimeUnit),
}

#[derive(Clone, Debug)]
pub struct TimeControl {
    mode: TimeMode,
    per_move: Option<Duration>,
    remaining: Option<Duration>,
}

impl TimeControl {
    pub fn new(mode: TimeMode) -> Self {
        Self {
            mode,
            per_move: None,
            remaining: None,
        }
    }

    /// Record the value of a `Time N` message.
    pub fn set(&mut self, n: u64) {
        match self.mode {
            TimeMode::PerMove => self.per_move = Some(Duration::from_millis(n)),
            TimeMode::GameClock(unit) => {
                let minutes = match unit {
                    TimeUnit::Auto => n <= AUTO_MINUTES_THRESHOLD,
                    TimeUnit::Seconds => false,
                    TimeUnit::Minutes => true,
                };
                let secs = if minutes { n.saturating_mul(60) } else { n };
                self.remaining = Some(Duration::from_secs(secs));
            }
        }
    }

    /// Budget for the next move.
    pub fn budget(&self) -> Duration {
        match self.mode {
            TimeMode::PerMove => match self.per_move {
                Some(limit) => {
                    let margin = (limit / 10).min(Duration::from_millis(SAFETY_MARGIN_MAX_MS));
                    limit - margin
                }
                None => Duration::from_millis(DEFAULT_BUDGET_MS),
            },
            TimeMode::GameClock(_) => match self.remaining {
                Some(left) => {
                    let usable = left.saturating_sub(Duration::from_millis(CLOCK_RESERVE_MS));
                    (usable / CLOCK_DIVISOR as u32).clamp(
                        Duration::from_millis(CLOCK_MIN_BUDGET_MS),
                        Duration::from_millis(CLOCK_MAX_BUDGET_MS),
                    )
                }
                None => Duration::from_millis(DEFAULT_BUDGET_MS),
            },
        }
    }

    /// Deduct the time one of our moves took from the game clock.
    pub fn spend(&mut self, elapsed: Duration) {
        if let Some(left) = self.remaining.as_mut() {
            *left = left.saturating_sub(elapsed);
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Forget the previous game's clock.
    pub fn reset(&mut self) {
        self.per_move = None;
        self.remaining = None;
    }
}
