//! Durable record storage.
//!
//! [`RecordStore`] is the boundary the pipeline talks to. It enforces the
//! record invariants (one agent per owner, immutable execution snapshots,
//! ordered timestamps, frozen terminal records) so no caller can bypass them,
//! with one documented exception: [`RecordStore::force_fail_execution`].
//!
//! [`FileStore`] keeps each record as a JSON file under `.agentry/`.

mod file;


pub use file::FileStore;

use crate::agent::Agent;
use crate::error::Result;
use crate::events::Event;
use crate::execution::{Execution, ExecutionStatus, NewExecution};
use crate::owner::{OwnerRecord, OwnerRef};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Query over executions. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionFilter {
    pub agent_id: Option<u64>,
    pub status: Option<ExecutionStatus>,
}

impl ExecutionFilter {
    pub fn for_agent(agent_id: u64) -> Self {
        Self {
            agent_id: Some(agent_id),
            status: None,
        }
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, exec: &Execution) -> bool {
        self.agent_id.is_none_or(|id| exec.agent_id == id)
            && self.status.is_none_or(|status| exec.status == status)
    }
}

/// Create/read/update/delete of owners, agents and executions.
pub trait RecordStore {
    // ---------------------------------------------------------------------
    // Owners
    // ---------------------------------------------------------------------

    /// Create an owner. Rejects unregistered types, missing required fields
    /// and duplicates.
    fn create_owner(&self, owner: OwnerRef, fields: BTreeMap<String, Value>)
    -> Result<OwnerRecord>;

    /// Load an owner with its ancestor chain attached.
    fn get_owner(&self, owner: &OwnerRef) -> Result<OwnerRecord>;

    fn list_owners(&self) -> Result<Vec<OwnerRecord>>;

    /// Delete an owner, its agent, and that agent's executions.
    fn delete_owner(&self, owner: &OwnerRef) -> Result<()>;

    // ---------------------------------------------------------------------
    // Agents
    // ---------------------------------------------------------------------

    /// Persist a draft agent. The owner must exist and must not already have
    /// an agent. Id and timestamps are assigned by the store.
    fn create_agent(&self, draft: Agent) -> Result<Agent>;

    fn get_agent(&self, agent_id: u64) -> Result<Agent>;

    /// Save changed agent settings. The owner reference cannot change.
    fn update_agent(&self, agent: &Agent) -> Result<Agent>;

    fn list_agents(&self) -> Result<Vec<Agent>>;

    /// Delete an agent and its executions.
    fn delete_agent(&self, agent_id: u64) -> Result<()>;

    fn agent_for_owner(&self, owner: &OwnerRef) -> Result<Option<Agent>> {
        Ok(self
            .list_agents()?
            .into_iter()
            .find(|agent| &agent.owner == owner))
    }

    /// Create a default agent for `owner`, named after the owner type.
    fn create_agent_for_owner(&self, owner: &OwnerRef, max_iterations: u32) -> Result<Agent> {
        let mut draft = Agent::draft(owner.clone());
        draft.max_iterations = max_iterations;
        self.create_agent(draft)
    }

    /// The owner's agent, or an unsaved default draft when it has none.
    fn agent_or_build(&self, owner: &OwnerRef) -> Result<Agent> {
        Ok(self
            .agent_for_owner(owner)?
            .unwrap_or_else(|| Agent::draft(owner.clone())))
    }

    // ---------------------------------------------------------------------
    // Executions
    // ---------------------------------------------------------------------

    /// Create a pending execution for an existing agent.
    fn create_execution(&self, new: NewExecution) -> Result<Execution>;

    fn get_execution(&self, execution_id: u64) -> Result<Execution>;

    /// Save a validated execution. Rejects changes to the prompt, snapshot or
    /// agent, misordered timestamps, and any state change on a terminal record.
    fn update_execution(&self, exec: &Execution) -> Result<Execution>;

    /// Executions matching `filter`, oldest first.
    fn list_executions(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>>;

    /// Write `status = failed`, `error_message` and `completed_at` without
    /// any validation. `message` must already be sanitized.
    fn force_fail_execution(
        &self,
        execution_id: u64,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Execution>;

    /// Record an audit event. Stores without an audit trail ignore it.
    fn audit(&self, _event: Event) {}
}

/// File stem of an agent record (`AGENT-000001`).
pub fn agent_key(agent_id: u64) -> String {
    format!("AGENT-{:06}", agent_id)
}

/// File stem of an execution record (`EXEC-000001`).
pub fn execution_key(execution_id: u64) -> String {
    format!("EXEC-{:06}", execution_id)
}

/// Parse a record id out of a key such as `EXEC-000012`.
pub(crate) fn parse_key(key: &str, prefix: &str) -> Option<u64> {
    key.strip_prefix(prefix)?
        .strip_prefix('-')
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))?
        .parse()
        .ok()
}
