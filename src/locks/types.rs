//! Lock type definitions and information structures.

use super::metadata::{LockMetadata, format_age};
use std::path::PathBuf;

/// Type of lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    /// Store-wide lock for id allocation and uniqueness checks.
    Store,
    /// Per-agent lock serializing executions of one agent.
    Agent,
}

impl LockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Store => "store",
            LockType::Agent => "agent",
        }
    }

    /// Classify a lock by its file stem.
    pub(super) fn from_name(name: &str) -> Option<Self> {
        if name == "store" {
            Some(LockType::Store)
        } else if name
            .strip_prefix("agent-")
            .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        {
            Some(LockType::Agent)
        } else {
            None
        }
    }
}

/// Information about an active lock.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The lock name (e.g., "store", "agent-3").
    pub name: String,

    pub lock_type: LockType,

    pub metadata: LockMetadata,

    /// Whether the lock is older than the configured stale threshold.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (holder: {}, age: {}, action: {}{})",
            self.name,
            self.metadata.holder,
            format_age(self.metadata.age()),
            self.metadata.action,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
