//! Low-jitter clock for high-rate sessions.
//!
//! `thread::sleep` typically overshoots by scheduler-quantum amounts, which
//! is visible at a 1 ms tick. `SpinClock` sleeps most of the interval and
//! spins the remainder, trading CPU for precision.

use exo_traits::Clock;
use spin_sleep::SpinSleeper;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct SpinClock {
    sleeper: SpinSleeper,
}

impl SpinClock {
    pub fn new() -> Self {
        Self {
            sleeper: SpinSleeper::default(),
        }
    }
}

impl Default for SpinClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SpinClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        self.sleeper.sleep(d);
    }
}
