//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use wall_core::model::{ProtocolError, ProtocolId};
use wall_core::progress::ProgressError;

/// Errors emitted while loading the protocol library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("protocol library is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("protocol library lists {0} more than once")]
    DuplicateId(ProtocolId),
}

/// Errors emitted by `WallService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WallServiceError {
    #[error("no protocol {0} in the library")]
    UnknownProtocol(ProtocolId),
    #[error("protocol {0} is already on the wall")]
    AlreadyTracked(ProtocolId),
    #[error("protocol {0} is not on the wall")]
    NotTracked(ProtocolId),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
