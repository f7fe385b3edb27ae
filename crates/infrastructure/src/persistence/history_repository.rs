//! Request history persistence.
//!
//! `FileHistoryRepository` stores history in the platform-specific config
//! directory by default:
//! - Linux/macOS: ~/.config/relay/history.json
//! - Windows: %APPDATA%/relay/history.json
//!
//! `InMemoryHistoryRepository` keeps the same bounded list in memory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_application::ports::{HistoryError, HistoryRepository};
use relay_domain::{HistoryEntry, RequestHistory};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

fn serialization_error(error: SerializationError) -> HistoryError {
    HistoryError::Serialization(error.to_string())
}

/// History kept in memory, newest first, bounded by `limit`.
#[derive(Debug)]
pub struct InMemoryHistoryRepository {
    history: RwLock<RequestHistory>,
}

impl InMemoryHistoryRepository {
    /// Creates an empty repository keeping at most `limit` entries.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            history: RwLock::new(RequestHistory::new(limit)),
        }
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn insert(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.history.write().await.add(entry);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>, HistoryError> {
        Ok(self.history.read().await.get(id).cloned())
    }

    async fn all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.history.read().await.entries().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        Ok(self.history.write().await.remove(id))
    }

    async fn executed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.history.read().await.executed_between(from, to))
    }
}

/// History stored as one deterministic JSON file.
///
/// Writes go through a lock so concurrent inserts from detached tasks do
/// not lose entries.
#[derive(Debug)]
pub struct FileHistoryRepository {
    path: PathBuf,
    limit: usize,
    lock: Mutex<()>,
}

impl FileHistoryRepository {
    /// Creates a repository backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
            lock: Mutex::new(()),
        }
    }

    /// Creates a repository at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn at_default_location(limit: usize) -> Result<Self, HistoryError> {
        Self::default_path()
            .map(|path| Self::new(path, limit))
            .ok_or(HistoryError::NoLocation)
    }

    /// Returns the default history file path, if available.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("relay").join("history.json"))
    }

    /// The file this repository reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads history from disk.
    ///
    /// Returns empty history if the file doesn't exist.
    async fn load(&self) -> Result<RequestHistory, HistoryError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(RequestHistory::new(self.limit));
        }

        let content = fs::read(&self.path).await?;
        let mut history: RequestHistory = from_json_bytes(&content).map_err(serialization_error)?;
        history.set_max_entries(self.limit);
        Ok(history)
    }

    async fn save(&self, history: &RequestHistory) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(history).map_err(serialization_error)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for FileHistoryRepository {
    async fn insert(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        let mut history = self.load().await?;
        history.add(entry);
        self.save(&history).await
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>, HistoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(id).cloned())
    }

    async fn all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.entries().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let _guard = self.lock.lock().await;
        let mut history = self.load().await?;
        let removed = history.remove(id);
        if removed {
            self.save(&history).await?;
        }
        Ok(removed)
    }

    async fn executed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.executed_between(from, to))
    }
}
