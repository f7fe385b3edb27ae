//! Executor settings
//!
//! Tunables for the request pipeline. Every field has a default so a
//! partial settings file is valid.

use serde::{Deserialize, Serialize};

/// Settings for request execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSettings {
    /// User-Agent attached to every outbound request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Overall request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum number of history entries to keep.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Script sandbox limits.
    #[serde(default)]
    pub script: ScriptSettings,
}

fn default_user_agent() -> String {
    concat!("Relay/", env!("CARGO_PKG_VERSION")).to_string()
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_max_redirects() -> usize {
    10
}

const fn default_history_limit() -> usize {
    100
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            history_limit: default_history_limit(),
            script: ScriptSettings::default(),
        }
    }
}

/// Resource limits for script engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Rhai operation budget per script run (0 = unlimited).
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// JavaScript wall-clock budget per script run in milliseconds.
    #[serde(default = "default_script_timeout_ms")]
    pub timeout_ms: u64,

    /// JavaScript heap limit in bytes.
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: usize,
}

const fn default_max_operations() -> u64 {
    1_000_000
}

const fn default_script_timeout_ms() -> u64 {
    5_000
}

const fn default_memory_limit_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            timeout_ms: default_script_timeout_ms(),
            memory_limit_bytes: default_memory_limit_bytes(),
        }
    }
}
