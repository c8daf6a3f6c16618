//! Progress and streak aggregation over a snapshot of a user's wall.
//!
//! Everything here is a pure function of its inputs: the tracked protocols,
//! an explicit reference instant and the [`CalendarPolicy`]. Nothing reads the
//! system clock or touches storage, so results are reproducible in tests and
//! safe to compute concurrently over independent snapshots.
//!
//! Entries whose date cannot be parsed are ignored by every day-bucketed
//! metric rather than failing the computation.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calendar::CalendarPolicy;
use crate::model::{CompletionEntry, TrackedProtocol};

mod ranking;
mod streak;
mod window;

pub use ranking::{DEFAULT_RANK_LIMIT, RankDirection, RankedProtocol};
pub use streak::Streaks;
pub use window::{Timeframe, Window};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Invalid selectors passed by a caller. Data problems never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("invalid timeframe {0:?}: expected day, week or month")]
    InvalidTimeframe(String),
    #[error("invalid ranking direction {0:?}: expected top or attention")]
    InvalidDirection(String),
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Every derived metric for one timeframe, as served to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub timeframe: Timeframe,
    pub window: Window,
    pub daily_compliance: u8,
    pub overall_progress: u8,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub days_applied: u32,
    pub days_all_satisfied: u32,
    pub top_performing: Vec<RankedProtocol>,
    pub needs_attention: Vec<RankedProtocol>,
}

//
// ─── AGGREGATOR ────────────────────────────────────────────────────────────────
//

/// Computes compliance, streaks and rankings under a fixed calendar policy.
///
/// # Examples
///
/// ```
/// # use wall_core::progress::{ProgressAggregator, Timeframe};
/// # use wall_core::CalendarPolicy;
/// let aggregator = ProgressAggregator::new(CalendarPolicy::default());
/// let report = aggregator.summarize(&[], Timeframe::Week, wall_core::time::fixed_now());
/// assert_eq!(report.overall_progress, 0);
/// assert!(report.top_performing.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressAggregator {
    policy: CalendarPolicy,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(policy: CalendarPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &CalendarPolicy {
        &self.policy
    }

    /// Inclusive day range of `timeframe` around `now`.
    #[must_use]
    pub fn resolve_window(&self, timeframe: Timeframe, now: DateTime<Utc>) -> Window {
        window::resolve(timeframe, &now, &self.policy)
    }

    /// Entries of `protocol` whose day falls inside `window`.
    #[must_use]
    pub fn filter_history<'a>(
        &self,
        protocol: &'a TrackedProtocol,
        window: &Window,
    ) -> Vec<&'a CompletionEntry> {
        protocol
            .completion_history()
            .iter()
            .filter(|entry| {
                entry
                    .day(&self.policy)
                    .is_some_and(|day| window.contains(day))
            })
            .collect()
    }

    /// Completions of `protocol` in `window`, at most one per day.
    #[must_use]
    pub fn completion_count(&self, protocol: &TrackedProtocol, window: &Window) -> u32 {
        let days: BTreeSet<NaiveDate> = self
            .filter_history(protocol, window)
            .into_iter()
            .filter_map(|entry| entry.day(&self.policy))
            .collect();
        saturating_u32(days.len())
    }

    /// Percentage of protocols completed on `now`'s day.
    #[must_use]
    pub fn daily_compliance(&self, protocols: &[TrackedProtocol], now: DateTime<Utc>) -> u8 {
        let today = self.policy.day_of(&now);
        let done = protocols
            .iter()
            .filter(|p| p.is_completed_on(today, &self.policy))
            .count();
        percent(done as u64, protocols.len() as u64)
    }

    /// Completion density over the window: actual / (protocols * days).
    #[must_use]
    pub fn overall_progress(&self, protocols: &[TrackedProtocol], window: &Window) -> u8 {
        let possible = protocols.len() as u64 * u64::from(window.days());
        let actual: u64 = protocols
            .iter()
            .map(|p| u64::from(self.completion_count(p, window)))
            .sum();
        percent(actual, possible)
    }

    /// Current and longest runs of days on which every protocol was completed.
    #[must_use]
    pub fn compute_streaks(&self, protocols: &[TrackedProtocol], now: DateTime<Utc>) -> Streaks {
        let days = streak::fully_compliant_days(protocols, &self.policy);
        streak::compute(&days, self.policy.day_of(&now))
    }

    /// Ranked `{title, completionCount}` rows for the window.
    #[must_use]
    pub fn rank_protocols(
        &self,
        protocols: &[TrackedProtocol],
        window: &Window,
        direction: RankDirection,
        limit: usize,
    ) -> Vec<RankedProtocol> {
        let counted: Vec<(&str, u32)> = protocols
            .iter()
            .map(|p| (p.title(), self.completion_count(p, window)))
            .collect();
        ranking::rank(counted, direction, limit)
    }

    /// Distinct days in the window with at least one completion.
    #[must_use]
    pub fn days_applied(&self, protocols: &[TrackedProtocol], window: &Window) -> u32 {
        let days: BTreeSet<NaiveDate> = protocols
            .iter()
            .flat_map(|p| self.filter_history(p, window))
            .filter_map(|entry| entry.day(&self.policy))
            .collect();
        saturating_u32(days.len())
    }

    /// Days in the window on which every protocol was completed.
    #[must_use]
    pub fn days_all_satisfied(&self, protocols: &[TrackedProtocol], window: &Window) -> u32 {
        let qualifying = streak::fully_compliant_days(protocols, &self.policy);
        saturating_u32(
            qualifying
                .into_iter()
                .filter(|day| window.contains(*day))
                .count(),
        )
    }

    /// All metrics for `timeframe`, rankings capped at [`DEFAULT_RANK_LIMIT`].
    #[must_use]
    pub fn summarize(
        &self,
        protocols: &[TrackedProtocol],
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> ProgressReport {
        let window = self.resolve_window(timeframe, now);
        let streaks = self.compute_streaks(protocols, now);

        ProgressReport {
            timeframe,
            window,
            daily_compliance: self.daily_compliance(protocols, now),
            overall_progress: self.overall_progress(protocols, &window),
            current_streak: streaks.current,
            longest_streak: streaks.longest,
            days_applied: self.days_applied(protocols, &window),
            days_all_satisfied: self.days_all_satisfied(protocols, &window),
            top_performing: self.rank_protocols(
                protocols,
                &window,
                RankDirection::Top,
                DEFAULT_RANK_LIMIT,
            ),
            needs_attention: self.rank_protocols(
                protocols,
                &window,
                RankDirection::Attention,
                DEFAULT_RANK_LIMIT,
            ),
        }
    }
}

/// `round(100 * part / whole)` with halves rounded up, clamped to 100.
fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part.saturating_mul(200) + whole) / (whole * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
