use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar::CalendarPolicy;
use crate::progress::ProgressError;

/// Reporting period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Day,
    Week,
    Month,
}

impl Timeframe {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            _ => Err(ProgressError::InvalidTimeframe(s.to_string())),
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    start: NaiveDate,
    end: NaiveDate,
}

impl Window {
    /// Builds a window, swapping the bounds if given in reverse.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Inclusive day count, never zero.
    #[must_use]
    pub fn days(&self) -> u32 {
        let span = (self.end - self.start).num_days() + 1;
        u32::try_from(span).unwrap_or(u32::MAX)
    }
}

pub(crate) fn resolve(
    timeframe: Timeframe,
    now: &DateTime<Utc>,
    policy: &CalendarPolicy,
) -> Window {
    let today = policy.day_of(now);
    match timeframe {
        Timeframe::Day => Window::new(today, today),
        Timeframe::Week => {
            let start = policy.week_start_of(today);
            let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
            Window::new(start, end)
        }
        Timeframe::Month => {
            let start = today.with_day(1).unwrap_or(today);
            let end = start
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(NaiveDate::MAX);
            Window::new(start, end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::noon_utc;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_window_is_single_day() {
        let w = resolve(Timeframe::Day, &noon_utc(2024, 1, 3), &CalendarPolicy::default());
        assert_eq!((w.start(), w.end()), (ymd(2024, 1, 3), ymd(2024, 1, 3)));
        assert_eq!(w.days(), 1);
    }

    #[test]
    fn week_window_starts_on_sunday_by_default() {
        let w = resolve(Timeframe::Week, &noon_utc(2024, 1, 3), &CalendarPolicy::default());
        assert_eq!((w.start(), w.end()), (ymd(2023, 12, 31), ymd(2024, 1, 6)));
        assert_eq!(w.days(), 7);
    }

    #[test]
    fn week_window_honours_monday_start() {
        let policy = CalendarPolicy::from_offset_minutes(0, Weekday::Mon).unwrap();
        let w = resolve(Timeframe::Week, &noon_utc(2024, 1, 7), &policy);
        assert_eq!((w.start(), w.end()), (ymd(2024, 1, 1), ymd(2024, 1, 7)));
    }

    #[test]
    fn month_window_covers_leap_february() {
        let w = resolve(Timeframe::Month, &noon_utc(2024, 2, 10), &CalendarPolicy::default());
        assert_eq!((w.start(), w.end()), (ymd(2024, 2, 1), ymd(2024, 2, 29)));
        assert_eq!(w.days(), 29);
    }

    #[test]
    fn month_window_handles_december() {
        let w = resolve(Timeframe::Month, &noon_utc(2023, 12, 31), &CalendarPolicy::default());
        assert_eq!((w.start(), w.end()), (ymd(2023, 12, 1), ymd(2023, 12, 31)));
    }

    #[test]
    fn window_always_contains_now() {
        let policy = CalendarPolicy::default();
        for day in 1..=31 {
            let now = noon_utc(2024, 1, day);
            for tf in [Timeframe::Day, Timeframe::Week, Timeframe::Month] {
                assert!(resolve(tf, &now, &policy).contains(policy.day_of(&now)));
            }
        }
    }

    #[test]
    fn timeframe_parsing_rejects_unknown_selector() {
        assert_eq!("Week".parse::<Timeframe>().unwrap(), Timeframe::Week);
        assert_eq!(
            "year".parse::<Timeframe>(),
            Err(ProgressError::InvalidTimeframe("year".into()))
        );
    }
}
