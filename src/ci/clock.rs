//! Time source for the CI gate.

use std::time::{Duration, Instant};

/// Elapsed time since the gate started, and a way to wait.
///
/// Tests substitute a manual clock that advances only when slept on, so
/// a fifteen-minute budget runs instantly.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Start counting from now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
