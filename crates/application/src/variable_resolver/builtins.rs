//! Standard dynamic variables
//!
//! Built-in names that generate a fresh value on every call. Randomness and
//! time are injected so generation is reproducible under test.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::SecondsFormat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Builder;

use crate::ports::Clock;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const EMAIL_DOMAINS: [&str; 4] = ["example.com", "test.com", "mail.com", "email.com"];
const RANDOM_STRING_LENGTH: usize = 10;
const EMAIL_LOCAL_PART_LENGTH: usize = 8;
const RANDOM_INT_UPPER: u32 = 1_000_000;

/// Information about a standard variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardVariableInfo {
    /// Variable name (lowercase)
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Example output
    pub example: &'static str,
}

const AVAILABLE: [StandardVariableInfo; 9] = [
    StandardVariableInfo {
        name: "guid",
        description: "Random UUID v4",
        example: "550e8400-e29b-41d4-a716-446655440000",
    },
    StandardVariableInfo {
        name: "uuid",
        description: "Random UUID v4 (alias of guid)",
        example: "550e8400-e29b-41d4-a716-446655440000",
    },
    StandardVariableInfo {
        name: "timestamp",
        description: "Unix timestamp in milliseconds",
        example: "1706284800000",
    },
    StandardVariableInfo {
        name: "isotimestamp",
        description: "Current local time, ISO 8601",
        example: "2024-01-26T12:00:00.000+01:00",
    },
    StandardVariableInfo {
        name: "randomint",
        description: "Random integer 0-999999",
        example: "427815",
    },
    StandardVariableInfo {
        name: "randomstring",
        description: "Random alphanumeric string (10 chars)",
        example: "aB3dE5fG7h",
    },
    StandardVariableInfo {
        name: "randomemail",
        description: "Random email address",
        example: "k3d9x0qa@example.com",
    },
    StandardVariableInfo {
        name: "datenow",
        description: "Current local date (YYYY-MM-DD)",
        example: "2024-01-26",
    },
    StandardVariableInfo {
        name: "timenow",
        description: "Current local time (HH:MM:SS)",
        example: "12:00:00",
    },
];

/// Generates values for standard variables.
pub struct StandardVariables {
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl StandardVariables {
    /// Creates a provider over an explicit random source.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            clock,
            rng: Mutex::new(rng),
        }
    }

    /// Creates a provider seeded from the operating system.
    #[must_use]
    pub fn from_os_rng(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, StdRng::from_os_rng())
    }

    /// Creates a provider with a fixed seed. Two providers with the same
    /// seed and clock produce the same sequence.
    #[must_use]
    pub fn seeded(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::new(clock, StdRng::seed_from_u64(seed))
    }

    /// Returns every supported variable with its description.
    #[must_use]
    pub fn available() -> &'static [StandardVariableInfo] {
        &AVAILABLE
    }

    /// Returns true if `name` is a standard variable, ignoring case.
    #[must_use]
    pub fn is_standard(name: &str) -> bool {
        let name = name.to_lowercase();
        AVAILABLE.iter().any(|info| info.name == name)
    }

    /// Generates a value, or `None` for names outside the supported set.
    #[must_use]
    pub fn generate(&self, name: &str) -> Option<String> {
        let value = match name.to_lowercase().as_str() {
            "guid" | "uuid" => self.uuid(),
            "timestamp" => self.clock.now().timestamp_millis().to_string(),
            "isotimestamp" => self
                .clock
                .now_local()
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            "randomint" => self.with_rng(|rng| rng.random_range(0..RANDOM_INT_UPPER)).to_string(),
            "randomstring" => self.random_string(RANDOM_STRING_LENGTH),
            "randomemail" => self.random_email(),
            "datenow" => self.clock.now_local().format("%Y-%m-%d").to_string(),
            "timenow" => self.clock.now_local().format("%H:%M:%S").to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Generates a value; unknown names echo back as `{UNKNOWN_VAR:name}`.
    #[must_use]
    pub fn value(&self, name: &str) -> String {
        self.generate(name)
            .unwrap_or_else(|| format!("{{UNKNOWN_VAR:{name}}}"))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    fn uuid(&self) -> String {
        let bytes: [u8; 16] = self.with_rng(|rng| rng.random());
        Builder::from_random_bytes(bytes).into_uuid().to_string()
    }

    fn random_string(&self, length: usize) -> String {
        self.with_rng(|rng| {
            (0..length)
                .map(|_| char::from(ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())]))
                .collect()
        })
    }

    fn random_email(&self) -> String {
        let local = self.random_string(EMAIL_LOCAL_PART_LENGTH).to_lowercase();
        let domain = self.with_rng(|rng| EMAIL_DOMAINS[rng.random_range(0..EMAIL_DOMAINS.len())]);
        format!("{local}@{domain}")
    }
}

impl std::fmt::Debug for StandardVariables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardVariables").finish_non_exhaustive()
    }
}
