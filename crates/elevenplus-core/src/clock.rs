//! Clock abstraction so timers and history timestamps are deterministic in tests.

use chrono::{DateTime, Duration, Utc};

/// Wall-clock source for the session controller.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// A clock fixed at the given instant.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. Has no effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Deterministic instant used by tests (2023-11-14T22:13:20Z, a Tuesday).
#[cfg(test)]
pub(crate) const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a clock fixed at [`FIXED_TEST_TIMESTAMP`].
#[cfg(test)]
pub(crate) fn fixed_test_clock() -> Clock {
    Clock::fixed(DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_test_clock();
        let start = clock.now();
        clock.advance(Duration::seconds(90));
        assert_eq!((clock.now() - start).num_seconds(), 90);
        assert!(clock.is_fixed());
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::System;
        clock.advance(Duration::days(365));
        assert!((clock.now() - Utc::now()).num_seconds().abs() < 5);
    }
}
