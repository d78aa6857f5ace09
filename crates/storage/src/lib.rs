#![forbid(unsafe_code)]

pub mod document;
pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRepository, AttemptRow, InMemoryRepository, Storage, StorageError, StudyPlanRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
