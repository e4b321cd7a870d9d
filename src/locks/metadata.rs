//! Contents of a lock file: who holds it and for what.

use crate::error::{AgentryError, Result};
use crate::events::actor_string;
use crate::fs::read_json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// JSON body of a `.lock` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// `user@HOST` of the holding process. Not a record owner.
    pub holder: String,

    pub pid: u32,

    pub acquired_at: DateTime<Utc>,

    /// Store operation or `execute`.
    pub action: String,
}

impl LockMetadata {
    pub fn new(action: &str) -> Self {
        Self {
            holder: actor_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
            action: action.to_string(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        read_json(path).map_err(|e| {
            AgentryError::LockError(format!("unreadable lock file '{}': {}", path.display(), e))
        })
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.acquired_at)
    }

    pub fn age(&self) -> Duration {
        self.age_at(Utc::now())
    }

    /// Whether a holder has kept the lock longer than `stale_minutes`.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > i64::from(stale_minutes)
    }
}

/// Short age for lock listings: `<1m`, `45m`, `3h 5m`, `2d 4h`.
pub fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    match (age.num_days(), age.num_hours()) {
        _ if minutes < 1 => "<1m".to_string(),
        (0, 0) => format!("{}m", minutes),
        (0, hours) => format!("{}h {}m", hours, minutes % 60),
        (days, hours) => format!("{}d {}h", days, hours % 24),
    }
}
