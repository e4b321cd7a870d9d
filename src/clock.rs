//! Time source for lifecycle timestamps.

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for record timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Return `now`, or one microsecond after `earlier` if the clock has not
/// moved past it.
pub fn strictly_after(now: DateTime<Utc>, earlier: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match earlier {
        Some(earlier) if now <= earlier => earlier + Duration::microseconds(1),
        _ => now,
    }
}
