#![forbid(unsafe_code)]

pub mod json_file;
pub mod repository;
pub mod sqlite;

pub use json_file::JsonFileRepository;
pub use repository::{InMemoryRepository, ProtocolEdit, Storage, StorageError, WallRepository};
pub use sqlite::{SqliteInitError, SqliteRepository};
