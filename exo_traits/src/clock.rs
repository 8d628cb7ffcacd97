use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for control timing across the stack.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - sleep_until(): blocks until `deadline`; the fixed-period loop uses this
///   with precomputed tick deadlines so per-tick latency cannot accumulate
/// - secs_since(): elapsed seconds from an epoch Instant as f64
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Block until `deadline`. Returns immediately if the deadline passed.
    fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if let Some(remaining) = deadline.checked_duration_since(now) {
            self.sleep(remaining);
        }
    }

    /// Seconds elapsed since `epoch`, saturating at 0 on underflow.
    fn secs_since(&self, epoch: Instant) -> f64 {
        self.now().saturating_duration_since(epoch).as_secs_f64()
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}
