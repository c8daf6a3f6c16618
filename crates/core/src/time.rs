use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::calendar::CalendarPolicy;

/// A simple clock abstraction so "now" is always passed in, never read ad hoc.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Calendar day of `now()` under the given policy.
    #[must_use]
    pub fn today(&self, policy: &CalendarPolicy) -> NaiveDate {
        policy.day_of(&self.now())
    }
}

/// Deterministic timestamp for tests and examples (2024-01-03T12:00:00Z, a Wednesday).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_704_283_200;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns noon UTC on the given calendar date. Test helper.
///
/// # Panics
///
/// Panics if the date is not a valid calendar date.
#[must_use]
pub fn noon_utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid calendar date")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_now_is_wednesday_noon() {
        let now = fixed_now();
        assert_eq!(now, noon_utc(2024, 1, 3));
        assert_eq!(
            Clock::fixed(now).today(&CalendarPolicy::default()),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
    }
}
