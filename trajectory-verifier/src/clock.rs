//! Time source for waypoint timing.
//!
//! The engine only ever asks for "now" as a `Duration` since an arbitrary
//! origin, so tests can drive it with `MockClock`. Elapsed times keep full
//! resolution; nothing is truncated to whole milliseconds.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Duration;
}

/// Monotonic wall clock, origin at construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
pub use mock::MockClock;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::new();
        let observer = clock.clone();
        clock.advance_ms(1_500);
        assert_eq!(observer.now(), Duration::from_millis(1_500));
        clock.advance(Duration::from_micros(250));
        assert_eq!(observer.now(), Duration::from_micros(1_500_250));
        clock.set(Duration::from_millis(42));
        assert_eq!(observer.now(), Duration::from_millis(42));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
