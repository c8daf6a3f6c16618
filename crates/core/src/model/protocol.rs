use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calendar::CalendarPolicy;
use crate::model::completion::CompletionEntry;
use crate::model::ids::ProtocolId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("protocol title cannot be empty")]
    EmptyTitle,
}

//
// ─── DETAILS ───────────────────────────────────────────────────────────────────
//

/// Descriptive metadata copied from the catalog when a protocol is added.
///
/// Opaque to progress calculations; only `title` ever shows up in reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDetails {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub time_required: Option<String>,
    pub frequency: Option<String>,
    pub benefits: Vec<String>,
    pub instructions: Vec<String>,
}

impl ProtocolDetails {
    /// Details carrying only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

//
// ─── TRACKED PROTOCOL ──────────────────────────────────────────────────────────
//

/// Result of toggling a day's completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// A protocol on a user's wall together with its completion history.
///
/// History is kept in insertion order, which need not be date order.
/// Completions have set-of-days semantics: at most one entry per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProtocol {
    protocol_id: ProtocolId,
    #[serde(flatten)]
    details: ProtocolDetails,
    added_date: DateTime<Utc>,
    completion_history: Vec<CompletionEntry>,
}

impl TrackedProtocol {
    /// Start tracking a protocol with an empty history.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::EmptyTitle` if the title is blank.
    pub fn new(
        protocol_id: ProtocolId,
        details: ProtocolDetails,
        added_date: DateTime<Utc>,
    ) -> Result<Self, ProtocolError> {
        if details.title.trim().is_empty() {
            return Err(ProtocolError::EmptyTitle);
        }
        Ok(Self {
            protocol_id,
            details,
            added_date,
            completion_history: Vec::new(),
        })
    }

    /// Rehydrate a tracked protocol from persisted storage.
    ///
    /// Performs no validation: stored data is taken as-is.
    #[must_use]
    pub fn from_persisted(
        protocol_id: ProtocolId,
        details: ProtocolDetails,
        added_date: DateTime<Utc>,
        completion_history: Vec<CompletionEntry>,
    ) -> Self {
        Self {
            protocol_id,
            details,
            added_date,
            completion_history,
        }
    }

    #[must_use]
    pub fn protocol_id(&self) -> &ProtocolId {
        &self.protocol_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.details.title
    }

    #[must_use]
    pub fn details(&self) -> &ProtocolDetails {
        &self.details
    }

    #[must_use]
    pub fn added_date(&self) -> DateTime<Utc> {
        self.added_date
    }

    #[must_use]
    pub fn completion_history(&self) -> &[CompletionEntry] {
        &self.completion_history
    }

    /// The entry recorded for `day`, if any.
    #[must_use]
    pub fn entry_on(&self, day: NaiveDate, policy: &CalendarPolicy) -> Option<&CompletionEntry> {
        self.completion_history
            .iter()
            .find(|entry| entry.day(policy) == Some(day))
    }

    #[must_use]
    pub fn is_completed_on(&self, day: NaiveDate, policy: &CalendarPolicy) -> bool {
        self.entry_on(day, policy).is_some()
    }

    /// Distinct days with a completion; unparseable entries are skipped.
    #[must_use]
    pub fn completed_days(&self, policy: &CalendarPolicy) -> BTreeSet<NaiveDate> {
        self.completion_history
            .iter()
            .filter_map(|entry| entry.day(policy))
            .collect()
    }

    /// Flip completion for `day`.
    ///
    /// Removes every entry on that day when one exists, otherwise appends a
    /// new entry carrying `notes`.
    pub fn toggle_completion(
        &mut self,
        day: NaiveDate,
        notes: Option<String>,
        policy: &CalendarPolicy,
    ) -> ToggleOutcome {
        let before = self.completion_history.len();
        self.completion_history
            .retain(|entry| entry.day(policy) != Some(day));

        if self.completion_history.len() < before {
            ToggleOutcome::Removed
        } else {
            self.completion_history
                .push(CompletionEntry::for_day(day, notes, policy));
            ToggleOutcome::Added
        }
    }

    /// Attach notes to `day`, marking it complete if it was not already.
    pub fn record_notes(&mut self, day: NaiveDate, notes: Option<String>, policy: &CalendarPolicy) {
        match self
            .completion_history
            .iter_mut()
            .find(|entry| entry.day(policy) == Some(day))
        {
            Some(entry) => entry.set_notes(notes),
            None => self
                .completion_history
                .push(CompletionEntry::for_day(day, notes, policy)),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn tracked(history: Vec<CompletionEntry>) -> TrackedProtocol {
        TrackedProtocol::from_persisted(
            ProtocolId::new("morning-light").unwrap(),
            ProtocolDetails::titled("Morning Light Exposure"),
            fixed_now(),
            history,
        )
    }

    #[test]
    fn new_rejects_blank_title() {
        let err = TrackedProtocol::new(
            ProtocolId::new("x").unwrap(),
            ProtocolDetails::titled("  "),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ProtocolError::EmptyTitle);
    }

    #[test]
    fn toggle_twice_restores_history() {
        let policy = CalendarPolicy::default();
        let mut protocol = tracked(vec![CompletionEntry::from_persisted("2024-01-01", None)]);
        let original = protocol.clone();

        assert_eq!(
            protocol.toggle_completion(day(3), None, &policy),
            ToggleOutcome::Added
        );
        assert!(protocol.is_completed_on(day(3), &policy));
        assert_eq!(
            protocol.toggle_completion(day(3), None, &policy),
            ToggleOutcome::Removed
        );
        assert_eq!(protocol, original);
    }

    #[test]
    fn toggle_matches_by_day_not_timestamp() {
        let policy = CalendarPolicy::default();
        let mut protocol = tracked(vec![CompletionEntry::from_persisted(
            "2024-01-03T18:45:00.000Z",
            Some("evening".into()),
        )]);

        assert_eq!(
            protocol.toggle_completion(day(3), None, &policy),
            ToggleOutcome::Removed
        );
        assert!(protocol.completion_history().is_empty());
    }

    #[test]
    fn toggle_removes_legacy_duplicates_for_a_day() {
        let policy = CalendarPolicy::default();
        let mut protocol = tracked(vec![
            CompletionEntry::from_persisted("2024-01-03T07:00:00Z", None),
            CompletionEntry::from_persisted("2024-01-02T07:00:00Z", None),
            CompletionEntry::from_persisted("2024-01-03T21:00:00Z", None),
        ]);

        protocol.toggle_completion(day(3), None, &policy);
        assert_eq!(protocol.completion_history().len(), 1);
        assert!(protocol.is_completed_on(day(2), &policy));
    }

    #[test]
    fn record_notes_updates_or_creates() {
        let policy = CalendarPolicy::default();
        let mut protocol = tracked(Vec::new());

        protocol.record_notes(day(3), Some("first".into()), &policy);
        protocol.record_notes(day(3), Some("second".into()), &policy);

        assert_eq!(protocol.completion_history().len(), 1);
        assert_eq!(
            protocol.entry_on(day(3), &policy).and_then(CompletionEntry::notes),
            Some("second")
        );
    }

    #[test]
    fn completed_days_skip_unparseable_entries() {
        let policy = CalendarPolicy::default();
        let protocol = tracked(vec![
            CompletionEntry::from_persisted("2024-01-02", None),
            CompletionEntry::from_persisted("not a date", None),
            CompletionEntry::from_persisted("2024-01-02T23:00:00Z", None),
        ]);

        let days: Vec<_> = protocol.completed_days(&policy).into_iter().collect();
        assert_eq!(days, vec![day(2)]);
    }
}
