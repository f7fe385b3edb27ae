//! Collection model
//!
//! A collection groups stored requests. Only the data contract lives here;
//! storage of collections belongs to the host application.

use serde::{Deserialize, Serialize};

use crate::request::Request;

/// A named group of requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique identifier.
    #[serde(default = "crate::generate_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Requests in display order.
    #[serde(default)]
    pub requests: Vec<Request>,
}

impl Collection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: crate::generate_id(),
            name: name.into(),
            requests: Vec::new(),
        }
    }

    /// Adds a request, stamping it with this collection's id.
    #[must_use]
    pub fn with_request(mut self, mut request: Request) -> Self {
        request.collection_id = Some(self.id.clone());
        self.requests.push(request);
        self
    }

    /// Finds a request by id or by name (ignoring ASCII case).
    #[must_use]
    pub fn find(&self, id_or_name: &str) -> Option<&Request> {
        self.requests
            .iter()
            .find(|r| r.id == id_or_name)
            .or_else(|| {
                self.requests
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(id_or_name))
            })
    }
}
