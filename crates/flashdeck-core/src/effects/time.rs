//! Wall-clock time

use chrono::{DateTime, Utc};

/// Source of wall-clock time for practice stamps and generated ids.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}
