//! Execution records and their state machine.
//!
//! ```text
//! pending ──start──▶ running ──complete──▶ completed
//!    │                  │
//!    └──────fail────────┴──────fail──────▶ failed
//! ```
//!
//! The transition methods here are pure: they check the current state, set
//! the timestamps they own, and leave persistence to [`ExecutionLifecycle`].
//! Terminal records reject every further transition.

mod lifecycle;

pub use lifecycle::ExecutionLifecycle;

use crate::clock::strictly_after;
use crate::error::{AgentryError, Result};
use crate::sanitize::sanitize_error_message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    /// Completed and failed records are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = AgentryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(AgentryError::InvalidInput(format!(
                "unknown execution status '{}': expected pending, running, completed or failed",
                other
            ))),
        }
    }
}

/// Fields supplied when creating an execution. Everything else starts at its
/// initial value.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub agent_id: u64,
    pub prompt: String,
    pub input_params: BTreeMap<String, Value>,
    pub metadata: BTreeMap<String, Value>,
}

/// One durable record of a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: u64,
    pub agent_id: u64,

    #[serde(default)]
    pub status: ExecutionStatus,

    /// The trimmed user message.
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Sanitized failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub interaction_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction_at: Option<DateTime<Utc>>,

    /// Snapshot of agent and owner fields taken at creation. Never modified.
    #[serde(default)]
    input_params: BTreeMap<String, Value>,

    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Execution {
    /// A pending execution with id `id`.
    pub fn new(id: u64, new: NewExecution, now: DateTime<Utc>) -> Self {
        Self {
            id,
            agent_id: new.agent_id,
            status: ExecutionStatus::Pending,
            prompt: new.prompt.trim().to_string(),
            result: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            interaction_count: 0,
            last_interaction_at: None,
            input_params: new.input_params,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn input_parameter(&self, key: &str) -> Option<&Value> {
        self.input_params.get(key)
    }

    pub fn input_parameters(&self) -> &BTreeMap<String, Value> {
        &self.input_params
    }

    /// pending → running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.require(ExecutionStatus::Pending, "start")?;
        self.status = ExecutionStatus::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// running → completed.
    pub fn complete(&mut self, result: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.require(ExecutionStatus::Running, "complete")?;
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(strictly_after(now, self.started_at));
        self.result = Some(result.into());
        Ok(())
    }

    /// pending | running → failed. The message is sanitized before it is stored.
    pub fn fail(&mut self, message: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.invalid("fail"));
        }
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(strictly_after(now, self.started_at));
        self.error_message = Some(sanitize_error_message(message));
        Ok(())
    }

    /// Count one model interaction. Valid in every state.
    pub fn record_interaction(&mut self, now: DateTime<Utc>) {
        self.interaction_count = self.interaction_count.saturating_add(1);
        self.last_interaction_at = Some(now);
    }

    /// Write the failed state without checking the current one.
    ///
    /// Only status, error message and completion time change. `message` must
    /// already be sanitized.
    pub(crate) fn force_failed(&mut self, message: String, now: DateTime<Utc>) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(message);
        self.completed_at = Some(strictly_after(now, self.started_at));
    }

    /// Validate the record at the store boundary.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(AgentryError::RecordInvalid(format!(
                "execution {}: prompt must not be blank",
                self.id
            )));
        }

        if let (Some(started), Some(completed)) = (self.started_at, self.completed_at)
            && started >= completed
        {
            return Err(AgentryError::RecordInvalid(format!(
                "execution {}: started_at ({}) must be before completed_at ({})",
                self.id,
                started.to_rfc3339(),
                completed.to_rfc3339()
            )));
        }

        Ok(())
    }

    fn require(&self, expected: ExecutionStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> AgentryError {
        AgentryError::InvalidTransition {
            execution_id: self.id,
            from: self.status,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn pending() -> Execution {
        Execution::new(
            1,
            NewExecution {
                agent_id: 1,
                prompt: "  Hello  ".to_string(),
                input_params: BTreeMap::from([("role".to_string(), json!("Assistant"))]),
                metadata: BTreeMap::new(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_execution_is_pending() {
        let exec = pending();
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert_eq!(exec.prompt, "Hello");
        assert_eq!(exec.interaction_count, 0);
        assert!(exec.started_at.is_none());
        assert_eq!(exec.input_parameter("role"), Some(&json!("Assistant")));
        assert_eq!(exec.input_parameters().len(), 1);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut exec = pending();
        let t0 = Utc::now();

        exec.start(t0).unwrap();
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert_eq!(exec.started_at, Some(t0));

        exec.complete("Hi there", t0 + Duration::seconds(2)).unwrap();
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert_eq!(exec.result.as_deref(), Some("Hi there"));
        assert_eq!(exec.completed_at, Some(t0 + Duration::seconds(2)));
        assert!(exec.validate().is_ok());
    }

    #[test]
    fn test_start_rejects_non_pending() {
        let mut exec = pending();
        let t0 = Utc::now();
        exec.start(t0).unwrap();

        let err = exec.start(t0 + Duration::seconds(1)).unwrap_err();
        assert!(matches!(
            err,
            AgentryError::InvalidTransition {
                from: ExecutionStatus::Running,
                action: "start",
                ..
            }
        ));
        // The original timestamp is untouched.
        assert_eq!(exec.started_at, Some(t0));
    }

    #[test]
    fn test_complete_requires_running() {
        let mut exec = pending();
        let err = exec.complete("done", Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "cannot complete execution 1: status is pending");
        assert_eq!(exec.status, ExecutionStatus::Pending);
    }

    #[test]
    fn test_fail_from_pending_and_running() {
        let mut from_pending = pending();
        from_pending.fail("boom", Utc::now()).unwrap();
        assert_eq!(from_pending.status, ExecutionStatus::Failed);
        assert!(from_pending.completed_at.is_some());

        let mut from_running = pending();
        from_running.start(Utc::now()).unwrap();
        from_running.fail("boom", Utc::now()).unwrap();
        assert_eq!(from_running.status, ExecutionStatus::Failed);
    }

    #[test]
    fn test_fail_sanitizes_message() {
        let mut exec = pending();
        exec.fail("could not reach admin@example.com at 10.0.0.1", Utc::now())
            .unwrap();
        assert_eq!(
            exec.error_message.as_deref(),
            Some("could not reach [EMAIL] at [IP]")
        );
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let t0 = Utc::now();
        let mut completed = pending();
        completed.start(t0).unwrap();
        completed.complete("ok", t0 + Duration::seconds(1)).unwrap();

        assert!(completed.start(t0).is_err());
        assert!(completed.complete("again", t0).is_err());
        assert!(completed.fail("late", t0).is_err());
        assert_eq!(completed.result.as_deref(), Some("ok"));
        assert!(completed.error_message.is_none());

        let mut failed = pending();
        failed.fail("boom", t0).unwrap();
        assert!(failed.start(t0).is_err());
        assert!(failed.fail("again", t0).is_err());
    }

    #[test]
    fn test_completion_never_precedes_start() {
        let mut exec = pending();
        let t0 = Utc::now();
        exec.start(t0).unwrap();

        // Same instant and a clock that went backwards.
        exec.complete("ok", t0 - Duration::seconds(3)).unwrap();
        assert!(exec.completed_at.unwrap() > t0);
        assert!(exec.validate().is_ok());
    }

    #[test]
    fn test_record_interaction_in_any_state() {
        let mut exec = pending();
        let t0 = Utc::now();
        exec.record_interaction(t0);
        exec.start(t0).unwrap();
        exec.complete("ok", t0 + Duration::seconds(1)).unwrap();
        exec.record_interaction(t0 + Duration::seconds(2));

        assert_eq!(exec.interaction_count, 2);
        assert_eq!(exec.last_interaction_at, Some(t0 + Duration::seconds(2)));
    }

    #[test]
    fn test_validate_rejects_misordered_timestamps() {
        let mut exec = pending();
        let t0 = Utc::now();
        exec.started_at = Some(t0);
        exec.completed_at = Some(t0);

        let err = exec.validate().unwrap_err();
        assert!(err.to_string().contains("must be before completed_at"));
    }

    #[test]
    fn test_validate_rejects_blank_prompt() {
        let mut exec = pending();
        exec.prompt = "   ".to_string();
        assert!(matches!(
            exec.validate().unwrap_err(),
            AgentryError::RecordInvalid(_)
        ));
    }

    #[test]
    fn test_status_serde_and_parse() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!("failed".parse::<ExecutionStatus>().unwrap(), ExecutionStatus::Failed);
        assert!("done".parse::<ExecutionStatus>().is_err());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }
}
