use std::collections::HashMap;

use sqlx::{Sqlite, Transaction};
use wall_core::model::{CompletionEntry, ProtocolId, TrackedProtocol, UserId};

use super::SqliteRepository;
use super::mapping::{
    conn, encode_list, map_entry_row, map_protocol_row, position_to_i64, protocol_id_from_row,
};
use crate::repository::{ProtocolEdit, StorageError, WallRepository};

const SELECT_PROTOCOLS: &str = r"
    SELECT protocol_id, title, description, category, difficulty, time_required, frequency,
           benefits, instructions, added_date
    FROM tracked_protocols
";

async fn write_history(
    tx: &mut Transaction<'_, Sqlite>,
    user: &UserId,
    protocol: &TrackedProtocol,
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM completion_entries WHERE user_id = ?1 AND protocol_id = ?2")
        .bind(user.as_str())
        .bind(protocol.protocol_id().as_str())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;

    for (position, entry) in protocol.completion_history().iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO completion_entries (user_id, protocol_id, position, date, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user.as_str())
        .bind(protocol.protocol_id().as_str())
        .bind(position_to_i64(position)?)
        .bind(entry.date_raw())
        .bind(entry.notes())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

async fn fetch_wall(
    tx: &mut Transaction<'_, Sqlite>,
    user: &UserId,
) -> Result<Vec<TrackedProtocol>, StorageError> {
    let entry_rows = sqlx::query(
        r"
        SELECT protocol_id, date, notes
        FROM completion_entries
        WHERE user_id = ?1
        ORDER BY protocol_id, position
        ",
    )
    .bind(user.as_str())
    .fetch_all(&mut **tx)
    .await
    .map_err(conn)?;

    let mut histories: HashMap<String, Vec<CompletionEntry>> = HashMap::new();
    for row in &entry_rows {
        histories
            .entry(protocol_id_from_row(row)?)
            .or_default()
            .push(map_entry_row(row)?);
    }

    let rows = sqlx::query(&format!(
        "{SELECT_PROTOCOLS} WHERE user_id = ?1 ORDER BY position"
    ))
    .bind(user.as_str())
    .fetch_all(&mut **tx)
    .await
    .map_err(conn)?;

    rows.iter()
        .map(|row| {
            let history = histories
                .remove(&protocol_id_from_row(row)?)
                .unwrap_or_default();
            map_protocol_row(row, history)
        })
        .collect()
}

async fn fetch_protocol(
    tx: &mut Transaction<'_, Sqlite>,
    user: &UserId,
    id: &ProtocolId,
) -> Result<Option<TrackedProtocol>, StorageError> {
    let Some(row) = sqlx::query(&format!(
        "{SELECT_PROTOCOLS} WHERE user_id = ?1 AND protocol_id = ?2"
    ))
    .bind(user.as_str())
    .bind(id.as_str())
    .fetch_optional(&mut **tx)
    .await
    .map_err(conn)?
    else {
        return Ok(None);
    };

    let history = sqlx::query(
        r"
        SELECT date, notes
        FROM completion_entries
        WHERE user_id = ?1 AND protocol_id = ?2
        ORDER BY position
        ",
    )
    .bind(user.as_str())
    .bind(id.as_str())
    .fetch_all(&mut **tx)
    .await
    .map_err(conn)?
    .iter()
    .map(map_entry_row)
    .collect::<Result<Vec<_>, _>>()?;

    map_protocol_row(&row, history).map(Some)
}

async fn write_details(
    tx: &mut Transaction<'_, Sqlite>,
    user: &UserId,
    protocol: &TrackedProtocol,
) -> Result<(), StorageError> {
    let details = protocol.details();
    sqlx::query(
        r"
        UPDATE tracked_protocols SET
            title = ?3,
            description = ?4,
            category = ?5,
            difficulty = ?6,
            time_required = ?7,
            frequency = ?8,
            benefits = ?9,
            instructions = ?10,
            added_date = ?11
        WHERE user_id = ?1 AND protocol_id = ?2
        ",
    )
    .bind(user.as_str())
    .bind(protocol.protocol_id().as_str())
    .bind(&details.title)
    .bind(&details.description)
    .bind(&details.category)
    .bind(&details.difficulty)
    .bind(&details.time_required)
    .bind(&details.frequency)
    .bind(encode_list(&details.benefits)?)
    .bind(encode_list(&details.instructions)?)
    .bind(protocol.added_date())
    .execute(&mut **tx)
    .await
    .map_err(conn)?;
    Ok(())
}

#[async_trait::async_trait]
impl WallRepository for SqliteRepository {
    async fn list_protocols(&self, user: &UserId) -> Result<Vec<TrackedProtocol>, StorageError> {
        // Both reads share one transaction so the snapshot is consistent.
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let protocols = fetch_wall(&mut tx, user).await?;
        tx.commit().await.map_err(conn)?;
        Ok(protocols)
    }

    async fn get_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<Option<TrackedProtocol>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let protocol = fetch_protocol(&mut tx, user, id).await?;
        tx.commit().await.map_err(conn)?;
        Ok(protocol)
    }

    async fn insert_protocol(
        &self,
        user: &UserId,
        protocol: &TrackedProtocol,
    ) -> Result<(), StorageError> {
        let details = protocol.details();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO tracked_protocols (
                user_id, protocol_id, position, title, description, category, difficulty,
                time_required, frequency, benefits, instructions, added_date
            )
            VALUES (
                ?1, ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM tracked_protocols WHERE user_id = ?1),
                ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
            )
            ",
        )
        .bind(user.as_str())
        .bind(protocol.protocol_id().as_str())
        .bind(&details.title)
        .bind(&details.description)
        .bind(&details.category)
        .bind(&details.difficulty)
        .bind(&details.time_required)
        .bind(&details.frequency)
        .bind(encode_list(&details.benefits)?)
        .bind(encode_list(&details.instructions)?)
        .bind(protocol.added_date())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StorageError::Conflict);
            }
            Err(e) => return Err(conn(e)),
        }

        write_history(&mut tx, user, protocol).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn update_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
        edit: ProtocolEdit<'_>,
    ) -> Result<Option<TrackedProtocol>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // No-op write: holds the write lock before the read.
        let locked = sqlx::query(
            "UPDATE tracked_protocols SET position = position WHERE user_id = ?1 AND protocol_id = ?2",
        )
        .bind(user.as_str())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        if locked.rows_affected() == 0 {
            return Ok(None);
        }

        let Some(mut protocol) = fetch_protocol(&mut tx, user, id).await? else {
            return Ok(None);
        };
        edit(&mut protocol);

        write_details(&mut tx, user, &protocol).await?;
        write_history(&mut tx, user, &protocol).await?;
        tx.commit().await.map_err(conn)?;
        Ok(Some(protocol))
    }

    async fn remove_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM tracked_protocols WHERE user_id = ?1 AND protocol_id = ?2")
            .bind(user.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn purge(&self, user: &UserId) -> Result<usize, StorageError> {
        let res = sqlx::query("DELETE FROM tracked_protocols WHERE user_id = ?1")
            .bind(user.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        usize::try_from(res.rows_affected())
            .map_err(|_| StorageError::Serialization("row count overflow".into()))
    }
}
