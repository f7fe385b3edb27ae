//! Request History Domain Model
//!
//! Every successful dispatch is recorded as an immutable `HistoryEntry`
//! pairing the request snapshot that was sent with the response received.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::response::ApiResponse;

/// A single executed request/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: String,
    executed_at: DateTime<Utc>,
    request: Request,
    response: ApiResponse,
}

impl HistoryEntry {
    /// Creates a new entry with a time-sortable id.
    #[must_use]
    pub fn new(request: Request, response: ApiResponse, executed_at: DateTime<Utc>) -> Self {
        Self {
            id: crate::generate_id_v7(),
            executed_at,
            request,
            response,
        }
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the request was executed.
    #[must_use]
    pub const fn executed_at(&self) -> DateTime<Utc> {
        self.executed_at
    }

    /// The request as it was sent.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// The response that was received.
    #[must_use]
    pub const fn response(&self) -> &ApiResponse {
        &self.response
    }
}

/// Request history with a maximum size limit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestHistory {
    /// History entries (newest first).
    entries: VecDeque<HistoryEntry>,
    /// Maximum number of entries to keep.
    #[serde(default = "default_max_entries")]
    max_entries: usize,
}

const fn default_max_entries() -> usize {
    100
}

impl RequestHistory {
    /// Creates a new empty history.
    #[must_use]
    pub const fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Adds an entry to the front, dropping the oldest beyond the limit.
    pub fn add(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.max_entries);
    }

    /// Changes the size limit, trimming if necessary.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
        self.entries.truncate(max_entries);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Finds an entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Removes an entry by id. Returns true if it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Entries executed in `[from, to]`, newest first.
    #[must_use]
    pub fn executed_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.executed_at >= from && e.executed_at <= to)
            .cloned()
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
