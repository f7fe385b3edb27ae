//! History repository port
//!
//! The executor's only write to persistent storage is appending a
//! `HistoryEntry`; the remaining operations serve history views.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use relay_domain::HistoryEntry;

/// Errors that can occur during history operations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No location to store history in.
    #[error("Could not determine history location")]
    NoLocation,
}

/// Append-only store of executed request/response pairs.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Appends an entry.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be persisted.
    async fn insert(&self, entry: HistoryEntry) -> Result<(), HistoryError>;

    /// Fetches an entry by id.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>, HistoryError>;

    /// Every entry, newest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    async fn all(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Deletes an entry. Returns true if it existed.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    async fn delete(&self, id: &str) -> Result<bool, HistoryError>;

    /// Entries executed in `[from, to]`, newest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    async fn executed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, HistoryError>;
}
