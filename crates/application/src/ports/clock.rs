//! Clock port
//!
//! Standard variables and history timestamps read time through this port so
//! tests can pin it.

use chrono::{DateTime, Local, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;

    /// The current time in the machine's local time zone.
    fn now_local(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }
}
