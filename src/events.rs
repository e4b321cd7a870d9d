//! Append-only audit event log.
//!
//! Events are stored in NDJSON format (one JSON object per line) in
//! `.agentry/events/events.ndjson`. The log complements the execution records:
//! records hold the latest state, the log holds every transition that led there.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (agent_create, execution_start, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `agent`: Optional agent id
//! - `execution`: Optional execution id
//! - `details`: Freeform object with action-specific details
//!
//! Error text placed in `details` must already be sanitized.
//!
//! ```no_run
//! use agentry::context::StoreContext;
//! use agentry::events::{Event, EventAction, append_event};
//! use serde_json::json;
//!
//! let ctx = StoreContext::resolve()?;
//! let event = Event::new(EventAction::AgentCreate)
//!     .with_agent(1)
//!     .with_details(json!({"name": "Support"}));
//! append_event(&ctx, &event)?;
//! # Ok::<(), agentry::error::AgentryError>(())
//! ```

use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Store initialization
    Init,
    /// Owner record created
    OwnerCreate,
    /// Owner record deleted (cascades to its agent)
    OwnerDelete,
    /// Agent created
    AgentCreate,
    /// Agent settings changed
    AgentUpdate,
    /// Agent deleted (cascades to its executions)
    AgentDelete,
    /// Execution created in pending
    ExecutionCreate,
    /// pending -> running
    ExecutionStart,
    /// running -> completed
    ExecutionComplete,
    /// -> failed, through a transition or a forced write
    ExecutionFail,
    /// Interaction counter incremented
    ExecutionInteraction,
    /// Lock cleared manually
    LockClear,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventAction::Init => "init",
            EventAction::OwnerCreate => "owner_create",
            EventAction::OwnerDelete => "owner_delete",
            EventAction::AgentCreate => "agent_create",
            EventAction::AgentUpdate => "agent_update",
            EventAction::AgentDelete => "agent_delete",
            EventAction::ExecutionCreate => "execution_create",
            EventAction::ExecutionStart => "execution_start",
            EventAction::ExecutionComplete => "execution_complete",
            EventAction::ExecutionFail => "execution_fail",
            EventAction::ExecutionInteraction => "execution_interaction",
            EventAction::LockClear => "lock_clear",
        };
        f.write_str(name)
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Agent the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<u64>,

    /// Execution the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<u64>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            agent: None,
            execution: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the agent id for this event.
    pub fn with_agent(mut self, agent_id: u64) -> Self {
        self.agent = Some(agent_id);
        self
    }

    /// Set the execution id for this event.
    pub fn with_execution(mut self, execution_id: u64) -> Self {
        self.execution = Some(execution_id);
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            AgentryError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Actor string (`USER@HOSTNAME`) for event and lock metadata.
pub(crate) fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Get the path to the events file.
pub fn events_file_path(ctx: &StoreContext) -> PathBuf {
    ctx.events_dir().join("events.ndjson")
}

/// Append an event to the events log.
///
/// The file and its directory are created on first use. Each append writes one
/// line and syncs it to disk.
pub fn append_event(ctx: &StoreContext, event: &Event) -> Result<()> {
    let events_file = events_file_path(ctx);
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            AgentryError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            AgentryError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            AgentryError::UserError(format!(
                "failed to write event to '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    Ok(())
}

/// Append an event, downgrading failures to a warning.
///
/// The audit log never blocks a record mutation that already succeeded.
pub fn record_event(ctx: &StoreContext, event: Event) {
    if let Err(e) = append_event(ctx, &event) {
        tracing::warn!(action = %event.action, error = %e, "failed to append audit event");
    }
}

/// Read every event in the log, oldest first.
pub fn read_events(ctx: &StoreContext) -> Result<Vec<Event>> {
    let events_file = events_file_path(ctx);
    if !events_file.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&events_file).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to read events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                AgentryError::UserError(format!("failed to parse event line: {}", e))
            })
        })
        .collect()
}
