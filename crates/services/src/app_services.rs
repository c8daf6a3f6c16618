use std::path::PathBuf;
use std::sync::Arc;

use storage::repository::Storage;
use wall_core::progress::ProgressAggregator;

use crate::catalog::Catalog;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::wall_service::WallService;
use crate::{CalendarPolicy, Clock};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    wall: Arc<WallService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Wire services over an already-open storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the bundled library cannot be loaded.
    pub fn new(
        storage: &Storage,
        clock: Clock,
        policy: CalendarPolicy,
    ) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(Catalog::embedded()?);
        let wall = Arc::new(WallService::new(
            clock,
            policy,
            Arc::clone(&catalog),
            Arc::clone(&storage.wall),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            ProgressAggregator::new(policy),
            Arc::clone(&storage.wall),
        ));

        Ok(Self {
            catalog,
            wall,
            progress,
        })
    }

    /// Build services backed by the JSON document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the document cannot be opened or the
    /// library cannot be loaded.
    pub async fn new_json_file(
        path: impl Into<PathBuf>,
        clock: Clock,
        policy: CalendarPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::json_file(path).await?;
        Self::new(&storage, clock, policy)
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connection, migrations or library
    /// loading fail.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        policy: CalendarPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(&storage, clock, policy)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn wall(&self) -> Arc<WallService> {
        Arc::clone(&self.wall)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
