//! Time sources for the search deadline.
//!
//! The search never reads the system time directly; it asks a [`Clock`].
//! Production code uses [`SystemClock`], tests use [`ManualClock`] to expire
//! the budget at an exact point in the search.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A monotonic time source. `now` is measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since the clock was created.
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that moves forward by `step` every time it is read.
///
/// With a step of zero it only moves when [`ManualClock::advance`] is called.
pub struct ManualClock {
    now: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let t = self.now.get();
        self.now.set(t + self.step);
        t
    }
}
