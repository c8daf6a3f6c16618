use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use wall_core::model::{CompletionEntry, ProtocolDetails, ProtocolId, TrackedProtocol};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Lists are stored as JSON arrays in a TEXT column.
pub(crate) fn encode_list(items: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(items).map_err(ser)
}

fn decode_list(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn protocol_id_from_row(row: &SqliteRow) -> Result<String, StorageError> {
    row.try_get("protocol_id").map_err(ser)
}

pub(crate) fn map_entry_row(row: &SqliteRow) -> Result<CompletionEntry, StorageError> {
    Ok(CompletionEntry::from_persisted(
        row.try_get::<String, _>("date").map_err(ser)?,
        row.try_get::<Option<String>, _>("notes").map_err(ser)?,
    ))
}

pub(crate) fn map_protocol_row(
    row: &SqliteRow,
    history: Vec<CompletionEntry>,
) -> Result<TrackedProtocol, StorageError> {
    let id = ProtocolId::new(protocol_id_from_row(row)?).map_err(ser)?;
    let added_date: DateTime<Utc> = row.try_get("added_date").map_err(ser)?;

    let details = ProtocolDetails {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        difficulty: row.try_get("difficulty").map_err(ser)?,
        time_required: row.try_get("time_required").map_err(ser)?,
        frequency: row.try_get("frequency").map_err(ser)?,
        benefits: decode_list(&row.try_get::<String, _>("benefits").map_err(ser)?)?,
        instructions: decode_list(&row.try_get::<String, _>("instructions").map_err(ser)?)?,
    };

    Ok(TrackedProtocol::from_persisted(id, details, added_date, history))
}

pub(crate) fn position_to_i64(position: usize) -> Result<i64, StorageError> {
    i64::try_from(position).map_err(|_| StorageError::Serialization("position overflow".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_round_trip_through_text() {
        let items = vec!["Hydrate".to_string(), "Walk \"outside\"".to_string()];
        let raw = encode_list(&items).unwrap();
        assert_eq!(decode_list(&raw).unwrap(), items);
    }

    #[test]
    fn malformed_list_is_a_serialization_error() {
        assert!(matches!(
            decode_list("not json"),
            Err(StorageError::Serialization(_))
        ));
    }
}
