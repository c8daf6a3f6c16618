#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod error;
pub mod progress_service;
pub mod wall_service;

pub use wall_core::{CalendarPolicy, Clock};

pub use app_services::AppServices;
pub use catalog::{AuthorSummary, Catalog, CategoryInfo};
pub use error::{AppServicesError, CatalogError, ProgressServiceError, WallServiceError};
pub use progress_service::ProgressService;
pub use wall_service::{ToggleResult, WallService};
