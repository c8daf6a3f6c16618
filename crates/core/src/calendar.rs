//! Mapping instants to calendar days.
//!
//! All day-bucketed arithmetic goes through a [`CalendarPolicy`]: a fixed UTC
//! offset plus a pinned first day of the week. Timestamps are converted to the
//! policy offset first and then truncated, so the same instant always lands on
//! the same day regardless of the host's local timezone.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc, Weekday,
};
use thiserror::Error;

const SECONDS_PER_MINUTE: i32 = 60;
/// chrono accepts offsets strictly inside +/- 24h.
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CalendarError {
    #[error("utc offset must be within +/-1439 minutes, got {0}")]
    InvalidOffset(i32),

    #[error("week start must be sunday or monday, got {0:?}")]
    InvalidWeekStart(String),
}

/// Canonical timezone and week convention for every day comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarPolicy {
    offset: FixedOffset,
    week_start: Weekday,
}

impl Default for CalendarPolicy {
    /// UTC days, weeks starting on Sunday.
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            week_start: Weekday::Sun,
        }
    }
}

impl CalendarPolicy {
    #[must_use]
    pub fn new(offset: FixedOffset, week_start: Weekday) -> Self {
        Self { offset, week_start }
    }

    /// Builds a policy from an offset in minutes east of UTC.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::InvalidOffset` if the offset is a day or more.
    pub fn from_offset_minutes(minutes: i32, week_start: Weekday) -> Result<Self, CalendarError> {
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
            return Err(CalendarError::InvalidOffset(minutes));
        }
        let offset = FixedOffset::east_opt(minutes * SECONDS_PER_MINUTE)
            .ok_or(CalendarError::InvalidOffset(minutes))?;
        Ok(Self::new(offset, week_start))
    }

    /// Parses `sunday`/`monday` (case-insensitive, short forms accepted).
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::InvalidWeekStart` for anything else.
    pub fn parse_week_start(raw: &str) -> Result<Weekday, CalendarError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sun" | "sunday" => Ok(Weekday::Sun),
            "mon" | "monday" => Ok(Weekday::Mon),
            _ => Err(CalendarError::InvalidWeekStart(raw.to_string())),
        }
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    #[must_use]
    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Calendar day an instant falls on.
    #[must_use]
    pub fn day_of(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// First day of the week containing `day`.
    #[must_use]
    pub fn week_start_of(&self, day: NaiveDate) -> NaiveDate {
        let back = (7 + day.weekday().num_days_from_sunday()
            - self.week_start.num_days_from_sunday())
            % 7;
        day - Duration::days(i64::from(back))
    }

    /// Midnight of `day` in the policy offset, as a UTC instant.
    #[must_use]
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let local = day.and_time(NaiveTime::MIN);
        match self.offset.from_local_datetime(&local).single() {
            Some(at) => at.with_timezone(&Utc),
            // Unreachable for a fixed offset.
            None => Utc.from_utc_datetime(&local),
        }
    }

    /// Interprets a persisted timestamp as a calendar day.
    ///
    /// Accepts RFC 3339 with an offset, a naive `YYYY-MM-DDTHH:MM:SS[.fff]`
    /// (read as policy-local time) and a bare `YYYY-MM-DD`. Returns `None` for
    /// anything else so callers can skip the entry.
    #[must_use]
    pub fn parse_day(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&self.offset).date_naive());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.date());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    /// Canonical persisted form of a day: its local midnight in RFC 3339.
    #[must_use]
    pub fn format_day(&self, day: NaiveDate) -> String {
        self.start_of_day(day)
            .with_timezone(&self.offset)
            .to_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_supported_shapes() {
        let policy = CalendarPolicy::default();
        assert_eq!(policy.parse_day("2024-01-03T23:59:59.000Z"), Some(ymd(2024, 1, 3)));
        assert_eq!(policy.parse_day("2024-01-03"), Some(ymd(2024, 1, 3)));
        assert_eq!(policy.parse_day("2024-01-03T08:15:00"), Some(ymd(2024, 1, 3)));
        assert_eq!(policy.parse_day("2024-01-04T01:00:00+05:00"), Some(ymd(2024, 1, 3)));
    }

    #[test]
    fn unparseable_dates_yield_none() {
        let policy = CalendarPolicy::default();
        assert_eq!(policy.parse_day(""), None);
        assert_eq!(policy.parse_day("yesterday"), None);
        assert_eq!(policy.parse_day("2024-13-45"), None);
        assert_eq!(policy.parse_day("Wed Jan 03 2024"), None);
    }

    #[test]
    fn offset_moves_instants_across_midnight() {
        let policy = CalendarPolicy::from_offset_minutes(-300, Weekday::Sun).unwrap();
        assert_eq!(policy.parse_day("2024-01-03T02:00:00Z"), Some(ymd(2024, 1, 2)));
        let at = DateTime::parse_from_rfc3339("2024-01-03T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(policy.day_of(&at), ymd(2024, 1, 2));
    }

    #[test]
    fn rejects_out_of_range_offset() {
        assert_eq!(
            CalendarPolicy::from_offset_minutes(24 * 60, Weekday::Sun),
            Err(CalendarError::InvalidOffset(1440))
        );
    }

    #[test]
    fn week_start_respects_policy() {
        // 2024-01-03 is a Wednesday.
        let sunday = CalendarPolicy::default();
        assert_eq!(sunday.week_start_of(ymd(2024, 1, 3)), ymd(2023, 12, 31));
        assert_eq!(sunday.week_start_of(ymd(2023, 12, 31)), ymd(2023, 12, 31));

        let monday = CalendarPolicy::new(sunday.offset(), Weekday::Mon);
        assert_eq!(monday.week_start_of(ymd(2024, 1, 3)), ymd(2024, 1, 1));
        assert_eq!(monday.week_start_of(ymd(2023, 12, 31)), ymd(2023, 12, 25));
    }

    #[test]
    fn formatted_day_parses_back() {
        let policy = CalendarPolicy::from_offset_minutes(120, Weekday::Mon).unwrap();
        let raw = policy.format_day(ymd(2024, 2, 29));
        assert_eq!(raw, "2024-02-29T00:00:00+02:00");
        assert_eq!(policy.parse_day(&raw), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn week_start_parsing() {
        assert_eq!(CalendarPolicy::parse_week_start("Monday"), Ok(Weekday::Mon));
        assert_eq!(CalendarPolicy::parse_week_start("sun"), Ok(Weekday::Sun));
        assert!(CalendarPolicy::parse_week_start("friday").is_err());
    }
}
