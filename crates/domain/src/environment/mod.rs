//! Environment model
//!
//! An environment is a named set of variables consulted by the variable
//! resolver after script-set variables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named variable set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique identifier.
    #[serde(default = "crate::generate_id")]
    pub id: String,
    /// Environment name, unique within a workspace.
    pub name: String,
    /// Variables by name.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Environment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: crate::generate_id(),
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Sets a variable, returning `self` for chaining.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Looks up a variable ignoring ASCII case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let env = Environment::new("dev").with_variable("BaseUrl", "http://localhost");
        assert_eq!(env.get("baseurl"), Some("http://localhost"));
        assert_eq!(env.get("missing"), None);
    }
}
