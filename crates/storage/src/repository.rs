use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use wall_core::model::{ProtocolId, TrackedProtocol, UserId};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

/// In-place change to one tracked protocol, run while the store holds the
/// protocol exclusively.
pub type ProtocolEdit<'a> = Box<dyn FnOnce(&mut TrackedProtocol) + Send + 'a>;

/// Repository contract for a user's wall of tracked protocols.
///
/// Each call is atomic with respect to one user's data and is durable once it
/// returns `Ok`.
#[async_trait]
pub trait WallRepository: Send + Sync {
    /// All protocols on the user's wall, in the order they were added.
    ///
    /// Unknown users have an empty wall.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn list_protocols(&self, user: &UserId) -> Result<Vec<TrackedProtocol>, StorageError>;

    /// Fetch one tracked protocol.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn get_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<Option<TrackedProtocol>, StorageError>;

    /// Add a protocol to the wall.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the protocol is already tracked.
    async fn insert_protocol(
        &self,
        user: &UserId,
        protocol: &TrackedProtocol,
    ) -> Result<(), StorageError>;

    /// Read, edit and write back one tracked protocol as a single atomic step.
    ///
    /// Returns the protocol as stored after the edit, or `None` (without
    /// calling `edit`) when the protocol is not tracked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read or updated.
    async fn update_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
        edit: ProtocolEdit<'_>,
    ) -> Result<Option<TrackedProtocol>, StorageError>;

    /// Remove a protocol and its history. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be updated.
    async fn remove_protocol(&self, user: &UserId, id: &ProtocolId)
    -> Result<bool, StorageError>;

    /// Remove every protocol of the user. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be updated.
    async fn purge(&self, user: &UserId) -> Result<usize, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    walls: Arc<Mutex<HashMap<UserId, Vec<TrackedProtocol>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            walls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn with_walls<T>(
        &self,
        f: impl FnOnce(&mut HashMap<UserId, Vec<TrackedProtocol>>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self
            .walls
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl WallRepository for InMemoryRepository {
    async fn list_protocols(&self, user: &UserId) -> Result<Vec<TrackedProtocol>, StorageError> {
        self.with_walls(|walls| Ok(walls.get(user).cloned().unwrap_or_default()))
    }

    async fn get_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<Option<TrackedProtocol>, StorageError> {
        self.with_walls(|walls| {
            Ok(walls
                .get(user)
                .and_then(|wall| wall.iter().find(|p| p.protocol_id() == id))
                .cloned())
        })
    }

    async fn insert_protocol(
        &self,
        user: &UserId,
        protocol: &TrackedProtocol,
    ) -> Result<(), StorageError> {
        self.with_walls(|walls| {
            let wall = walls.entry(user.clone()).or_default();
            if wall.iter().any(|p| p.protocol_id() == protocol.protocol_id()) {
                return Err(StorageError::Conflict);
            }
            wall.push(protocol.clone());
            Ok(())
        })
    }

    async fn update_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
        edit: ProtocolEdit<'_>,
    ) -> Result<Option<TrackedProtocol>, StorageError> {
        self.with_walls(|walls| {
            let Some(slot) = walls
                .get_mut(user)
                .and_then(|wall| wall.iter_mut().find(|p| p.protocol_id() == id))
            else {
                return Ok(None);
            };
            edit(slot);
            Ok(Some(slot.clone()))
        })
    }

    async fn remove_protocol(
        &self,
        user: &UserId,
        id: &ProtocolId,
    ) -> Result<bool, StorageError> {
        self.with_walls(|walls| {
            let Some(wall) = walls.get_mut(user) else {
                return Ok(false);
            };
            let before = wall.len();
            wall.retain(|p| p.protocol_id() != id);
            Ok(wall.len() < before)
        })
    }

    async fn purge(&self, user: &UserId) -> Result<usize, StorageError> {
        self.with_walls(|walls| Ok(walls.remove(user).map_or(0, |wall| wall.len())))
    }
}

/// Wall repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub wall: Arc<dyn WallRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let wall: Arc<dyn WallRepository> = Arc::new(InMemoryRepository::new());
        Self { wall }
    }
}
