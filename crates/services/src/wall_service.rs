use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use storage::repository::{ProtocolEdit, StorageError, WallRepository};
use wall_core::model::{ProtocolDetails, ProtocolId, ToggleOutcome, TrackedProtocol, UserId};

use crate::catalog::Catalog;
use crate::error::WallServiceError;
use crate::{CalendarPolicy, Clock};

/// Protocol after a toggle, plus which way the toggle went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
    pub protocol: TrackedProtocol,
    pub outcome: ToggleOutcome,
}

/// Orchestrates a user's wall: adding, removing and checking off protocols.
#[derive(Clone)]
pub struct WallService {
    clock: Clock,
    policy: CalendarPolicy,
    catalog: Arc<Catalog>,
    wall: Arc<dyn WallRepository>,
}

impl WallService {
    #[must_use]
    pub fn new(
        clock: Clock,
        policy: CalendarPolicy,
        catalog: Arc<Catalog>,
        wall: Arc<dyn WallRepository>,
    ) -> Self {
        Self {
            clock,
            policy,
            catalog,
            wall,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CalendarPolicy {
        &self.policy
    }

    /// Every protocol on the wall, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::Storage` if repository access fails.
    pub async fn list(&self, user: &UserId) -> Result<Vec<TrackedProtocol>, WallServiceError> {
        Ok(self.wall.list_protocols(user).await?)
    }

    /// Track a library protocol, copying its metadata onto the wall.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::UnknownProtocol` if the library has no such id.
    /// Returns `WallServiceError::AlreadyTracked` if it is already on the wall.
    /// Returns `WallServiceError::Storage` if persistence fails.
    pub async fn add_from_catalog(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<TrackedProtocol, WallServiceError> {
        let entry = self
            .catalog
            .get(id)
            .ok_or_else(|| WallServiceError::UnknownProtocol(id.clone()))?;
        self.add_custom(user, id.clone(), entry.to_details()).await
    }

    /// Track a protocol that is not in the library.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::Protocol` for validation failures.
    /// Returns `WallServiceError::AlreadyTracked` if the id is already on the wall.
    /// Returns `WallServiceError::Storage` if persistence fails.
    pub async fn add_custom(
        &self,
        user: &UserId,
        id: ProtocolId,
        details: ProtocolDetails,
    ) -> Result<TrackedProtocol, WallServiceError> {
        let protocol = TrackedProtocol::new(id, details, self.clock.now())?;
        match self.wall.insert_protocol(user, &protocol).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => {
                return Err(WallServiceError::AlreadyTracked(protocol.protocol_id().clone()));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user = %user, protocol = %protocol.protocol_id(), "protocol added to wall");
        Ok(protocol)
    }

    /// Stop tracking a protocol. Its history goes with it.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::NotTracked` if the protocol is not on the wall.
    /// Returns `WallServiceError::Storage` if persistence fails.
    pub async fn remove(&self, user: &UserId, id: &ProtocolId) -> Result<(), WallServiceError> {
        if !self.wall.remove_protocol(user, id).await? {
            return Err(WallServiceError::NotTracked(id.clone()));
        }
        tracing::info!(user = %user, protocol = %id, "protocol removed from wall");
        Ok(())
    }

    /// Flip whether the protocol was done on `day` (today when `None`).
    ///
    /// `notes` are stored only when the toggle adds an entry.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::NotTracked` if the protocol is not on the wall.
    /// Returns `WallServiceError::Storage` if persistence fails.
    pub async fn toggle_completion(
        &self,
        user: &UserId,
        id: &ProtocolId,
        day: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<ToggleResult, WallServiceError> {
        let day = day.unwrap_or_else(|| self.clock.today(&self.policy));
        let policy = self.policy;
        let mut outcome = ToggleOutcome::Added;
        let protocol = self
            .update(
                user,
                id,
                Box::new(|protocol: &mut TrackedProtocol| {
                    outcome = protocol.toggle_completion(day, notes, &policy);
                }),
            )
            .await?;

        tracing::info!(
            user = %user,
            protocol = %id,
            %day,
            outcome = ?outcome,
            "completion toggled"
        );
        Ok(ToggleResult { protocol, outcome })
    }

    /// Attach notes to the day's entry, marking the day done if it was not.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::NotTracked` if the protocol is not on the wall.
    /// Returns `WallServiceError::Storage` if persistence fails.
    pub async fn save_notes(
        &self,
        user: &UserId,
        id: &ProtocolId,
        day: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<TrackedProtocol, WallServiceError> {
        let day = day.unwrap_or_else(|| self.clock.today(&self.policy));
        let policy = self.policy;
        let protocol = self
            .update(
                user,
                id,
                Box::new(move |protocol: &mut TrackedProtocol| {
                    protocol.record_notes(day, notes, &policy);
                }),
            )
            .await?;

        tracing::debug!(user = %user, protocol = %id, %day, "notes saved");
        Ok(protocol)
    }

    /// Drop every protocol and its history. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::Storage` if persistence fails.
    pub async fn purge(&self, user: &UserId) -> Result<usize, WallServiceError> {
        let removed = self.wall.purge(user).await?;
        tracing::warn!(user = %user, removed, "wall purged");
        Ok(removed)
    }

    /// Ids of the protocols already done today, in wall order.
    ///
    /// # Errors
    ///
    /// Returns `WallServiceError::Storage` if repository access fails.
    pub async fn completed_today(&self, user: &UserId) -> Result<Vec<ProtocolId>, WallServiceError> {
        let today = self.clock.today(&self.policy);
        let protocols = self.wall.list_protocols(user).await?;
        Ok(protocols
            .into_iter()
            .filter(|p| p.is_completed_on(today, &self.policy))
            .map(|p| p.protocol_id().clone())
            .collect())
    }

    async fn update(
        &self,
        user: &UserId,
        id: &ProtocolId,
        edit: ProtocolEdit<'_>,
    ) -> Result<TrackedProtocol, WallServiceError> {
        self.wall
            .update_protocol(user, id, edit)
            .await?
            .ok_or_else(|| WallServiceError::NotTracked(id.clone()))
    }
}
