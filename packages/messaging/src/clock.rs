//! Host-driven time

use std::time::Duration;

/// Monotonic time that only moves when the host says so.
///
/// The engine never reads the wall clock; timers compare deadlines against
/// this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Time never runs backwards.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = DeterministicClock::new();
        clock.advance(Duration::from_millis(300));
        clock.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(300));
        clock.set(Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }
}
