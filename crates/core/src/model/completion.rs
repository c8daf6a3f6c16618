use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::CalendarPolicy;

/// One day's recorded completion of a tracked protocol.
///
/// The timestamp is kept exactly as persisted and only interpreted as a day
/// when asked, so rows written by older schemas survive a round trip even when
/// their date cannot be parsed. Such entries simply never match any day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    date: String,
    notes: Option<String>,
}

impl CompletionEntry {
    /// Entry for `day`, stamped at the day's local midnight.
    #[must_use]
    pub fn for_day(day: NaiveDate, notes: Option<String>, policy: &CalendarPolicy) -> Self {
        Self {
            date: policy.format_day(day),
            notes: normalize_notes(notes),
        }
    }

    /// Rehydrate an entry from storage without validating the date.
    #[must_use]
    pub fn from_persisted(date: impl Into<String>, notes: Option<String>) -> Self {
        Self {
            date: date.into(),
            notes: normalize_notes(notes),
        }
    }

    /// The timestamp as stored.
    #[must_use]
    pub fn date_raw(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Calendar day of this entry, or `None` when the date is unparseable.
    #[must_use]
    pub fn day(&self, policy: &CalendarPolicy) -> Option<NaiveDate> {
        policy.parse_day(&self.date)
    }

    pub(crate) fn set_notes(&mut self, notes: Option<String>) {
        self.notes = normalize_notes(notes);
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}
