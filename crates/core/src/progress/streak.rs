use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::CalendarPolicy;
use crate::model::TrackedProtocol;

/// Current and longest runs of fully-compliant days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Day → number of distinct protocols completed on that day.
pub(crate) fn completion_counts(
    protocols: &[TrackedProtocol],
    policy: &CalendarPolicy,
) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for protocol in protocols {
        for day in protocol.completed_days(policy) {
            *counts.entry(day).or_insert(0) += 1;
        }
    }
    counts
}

/// Days on which every tracked protocol has an entry, ascending.
pub(crate) fn fully_compliant_days(
    protocols: &[TrackedProtocol],
    policy: &CalendarPolicy,
) -> Vec<NaiveDate> {
    if protocols.is_empty() {
        return Vec::new();
    }
    completion_counts(protocols, policy)
        .into_iter()
        .filter(|(_, count)| *count == protocols.len())
        .map(|(day, _)| day)
        .collect()
}

/// Runs over ascending qualifying days.
///
/// `current` only considers days up to `today` and is zero unless the last of
/// them is today or yesterday.
pub(crate) fn compute(days: &[NaiveDate], today: NaiveDate) -> Streaks {
    let mut longest = 0_u32;
    let mut run = 0_u32;
    let mut prev: Option<NaiveDate> = None;
    let mut latest_alive: Option<(NaiveDate, u32)> = None;

    for &day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(day) => run.saturating_add(1),
            _ => 1,
        };
        longest = longest.max(run);
        if day <= today {
            latest_alive = Some((day, run));
        }
        prev = Some(day);
    }

    let current = match latest_alive {
        Some((day, len)) if (today - day).num_days() <= 1 => len,
        _ => 0,
    };

    Streaks { current, longest }
}
