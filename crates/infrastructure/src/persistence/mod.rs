//! Persistence implementations for file-based storage.

mod history_repository;
mod settings_repository;

pub use history_repository::{FileHistoryRepository, InMemoryHistoryRepository};
pub use settings_repository::{SettingsError, SettingsRepository};
