//! Execution session
//!
//! A `Session` carries what outlives a single execution: the active
//! environment and the variables scripts have set so far. Clones share the
//! same variable map.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use relay_domain::Environment;

/// Environment plus script variables shared across executions.
#[derive(Debug, Clone, Default)]
pub struct Session {
    environment: BTreeMap<String, String>,
    variables: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Session {
    /// Creates a session over an environment.
    #[must_use]
    pub fn new(environment: &Environment) -> Self {
        Self::from_variables(environment.variables.clone())
    }

    /// Creates a session over raw environment variables.
    #[must_use]
    pub fn from_variables(environment: BTreeMap<String, String>) -> Self {
        Self {
            environment,
            variables: Arc::default(),
        }
    }

    /// Environment variables.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// A snapshot of the script variables.
    #[must_use]
    pub fn variables(&self) -> BTreeMap<String, String> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Looks up a script variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<String> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Sets a script variable.
    pub fn set_variable(&self, name: impl Into<String>, value: impl Into<String>) {
        self.variables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    /// Applies what a script changed, given the variables it started from
    /// and the ones it finished with.
    ///
    /// Only inserted, changed and removed names are written, so values set
    /// by others while the script ran survive unless the script touched the
    /// same name.
    pub fn apply_changes(&self, before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) {
        let mut current = self
            .variables
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for name in before.keys().filter(|name| !after.contains_key(*name)) {
            current.remove(name);
        }
        for (name, value) in after {
            if before.get(name) != Some(value) {
                current.insert(name.clone(), value.clone());
            }
        }
    }
}
