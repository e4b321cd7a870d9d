//! JSON-file record store.
//!
//! Layout under the state directory:
//!
//! ```text
//! owners/<Type>/<id>.json      (namespaced types use '.' for '::')
//! agents/AGENT-000001.json
//! executions/EXEC-000001.json
//! ids.json                     (highest id ever allocated per kind)
//! ```
//!
//! Ids are never reused: a deleted record's id stays retired so the event
//! log and `logs/EXEC-<n>/` never mix two records.
//!
//! Every write is atomic. Id allocation, uniqueness checks and cascading
//! deletes run under the store lock; updates of a single execution do not,
//! since only the lifecycle of the process running it writes that record.

use super::{ExecutionFilter, RecordStore, agent_key, execution_key, parse_key};
use crate::agent::Agent;
use crate::clock::{Clock, SystemClock};
use crate::config::OwnerTypeRegistry;
use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use crate::events::{Event, EventAction, record_event};
use crate::execution::{Execution, NewExecution};
use crate::fs::{atomic_write_json, read_json};
use crate::locks::acquire_store_lock;
use crate::owner::{OwnerRecord, OwnerRef};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const AGENT_PREFIX: &str = "AGENT";
const EXECUTION_PREFIX: &str = "EXEC";

/// File-backed [`RecordStore`].
pub struct FileStore {
    ctx: StoreContext,
    registry: OwnerTypeRegistry,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    pub fn new(ctx: StoreContext, registry: OwnerTypeRegistry) -> Self {
        Self {
            ctx,
            registry,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for record timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }

    pub fn registry(&self) -> &OwnerTypeRegistry {
        &self.registry
    }

    fn owner_path(&self, owner: &OwnerRef) -> PathBuf {
        self.ctx
            .owners_dir()
            .join(owner.owner_type.replace("::", "."))
            .join(format!("{}.json", owner.owner_id))
    }

    fn agent_path(&self, agent_id: u64) -> PathBuf {
        self.ctx
            .agents_dir()
            .join(format!("{}.json", agent_key(agent_id)))
    }

    fn execution_path(&self, execution_id: u64) -> PathBuf {
        self.ctx
            .executions_dir()
            .join(format!("{}.json", execution_key(execution_id)))
    }

    fn attach_ancestors(&self, record: OwnerRecord) -> Result<OwnerRecord> {
        let chain = self.registry.ancestor_chain(&record.owner.owner_type)?;
        Ok(record.with_ancestors(chain))
    }

    fn load_agent(&self, agent_id: u64) -> Result<Agent> {
        let path = self.agent_path(agent_id);
        if !path.is_file() {
            return Err(AgentryError::NotFound(format!("agent {}", agent_id)));
        }
        read_json(path)
    }

    fn load_execution(&self, execution_id: u64) -> Result<Execution> {
        let path = self.execution_path(execution_id);
        if !path.is_file() {
            return Err(AgentryError::NotFound(format!("execution {}", execution_id)));
        }
        read_json(path)
    }

    /// Next id for `prefix`, above every id allocated before. The caller holds
    /// the store lock.
    fn allocate_id(&self, dir: &Path, prefix: &str) -> Result<u64> {
        let path = self.ctx.id_counters_path();
        let mut counters: BTreeMap<String, u64> = if path.is_file() {
            read_json(&path)?
        } else {
            BTreeMap::new()
        };

        let on_disk = record_files(dir, prefix)?.last().map_or(0, |(max, _)| *max);
        let id = counters.get(prefix).copied().unwrap_or(0).max(on_disk) + 1;
        counters.insert(prefix.to_string(), id);
        atomic_write_json(&path, &counters)?;
        Ok(id)
    }

    /// Delete an agent and its executions. The caller holds the store lock.
    fn delete_agent_locked(&self, agent: &Agent) -> Result<usize> {
        let executions = self.list_executions(&ExecutionFilter::for_agent(agent.id))?;
        for exec in &executions {
            remove_record(&self.execution_path(exec.id))?;
            remove_logs(&self.ctx.execution_logs_dir(exec.id))?;
        }
        remove_record(&self.agent_path(agent.id))?;

        self.audit(
            Event::new(EventAction::AgentDelete)
                .with_agent(agent.id)
                .with_details(json!({
                    "owner": agent.owner.to_string(),
                    "executions_deleted": executions.len(),
                })),
        );
        Ok(executions.len())
    }
}

impl RecordStore for FileStore {
    fn create_owner(
        &self,
        owner: OwnerRef,
        fields: BTreeMap<String, Value>,
    ) -> Result<OwnerRecord> {
        let record = OwnerRecord::new(owner, fields, self.clock.now());
        record.validate(&self.registry)?;

        let _lock = acquire_store_lock(&self.ctx, "create_owner")?;
        let path = self.owner_path(&record.owner);
        if path.exists() {
            return Err(AgentryError::RecordInvalid(format!(
                "owner {} already exists",
                record.owner
            )));
        }
        atomic_write_json(&path, &record)?;

        self.audit(
            Event::new(EventAction::OwnerCreate)
                .with_details(json!({ "owner": record.owner.to_string() })),
        );
        self.attach_ancestors(record)
    }

    fn get_owner(&self, owner: &OwnerRef) -> Result<OwnerRecord> {
        let path = self.owner_path(owner);
        if !path.is_file() {
            return Err(AgentryError::NotFound(format!("owner {}", owner)));
        }
        let record: OwnerRecord = read_json(path)?;
        self.attach_ancestors(record)
    }

    fn list_owners(&self) -> Result<Vec<OwnerRecord>> {
        let owners_dir = self.ctx.owners_dir();
        let mut owners = Vec::new();

        for type_dir in list_dir(&owners_dir)? {
            if !type_dir.is_dir() {
                continue;
            }
            for path in list_dir(&type_dir)? {
                if is_record_file(&path) {
                    let record: OwnerRecord = read_json(&path)?;
                    owners.push(record);
                }
            }
        }

        owners.sort_by(|a, b| a.owner.cmp(&b.owner));
        owners
            .into_iter()
            .map(|record| self.attach_ancestors(record))
            .collect()
    }

    fn delete_owner(&self, owner: &OwnerRef) -> Result<()> {
        let _lock = acquire_store_lock(&self.ctx, "delete_owner")?;
        let path = self.owner_path(owner);
        if !path.is_file() {
            return Err(AgentryError::NotFound(format!("owner {}", owner)));
        }

        let agent = self.agent_for_owner(owner)?;
        if let Some(agent) = &agent {
            self.delete_agent_locked(agent)?;
        }
        remove_record(&path)?;

        self.audit(Event::new(EventAction::OwnerDelete).with_details(json!({
            "owner": owner.to_string(),
            "agent_deleted": agent.map(|a| a.id),
        })));
        Ok(())
    }

    fn create_agent(&self, draft: Agent) -> Result<Agent> {
        draft.validate()?;

        let _lock = acquire_store_lock(&self.ctx, "create_agent")?;
        if !self.owner_path(&draft.owner).is_file() {
            return Err(AgentryError::NotFound(format!("owner {}", draft.owner)));
        }
        if let Some(existing) = self.agent_for_owner(&draft.owner)? {
            return Err(AgentryError::RecordInvalid(format!(
                "owner {} already has agent {}",
                draft.owner, existing.id
            )));
        }

        let now = self.clock.now();
        let agent = Agent {
            id: self.allocate_id(&self.ctx.agents_dir(), AGENT_PREFIX)?,
            created_at: now,
            updated_at: now,
            ..draft
        };
        atomic_write_json(self.agent_path(agent.id), &agent)?;

        self.audit(
            Event::new(EventAction::AgentCreate)
                .with_agent(agent.id)
                .with_details(json!({
                    "owner": agent.owner.to_string(),
                    "name": agent.name,
                })),
        );
        Ok(agent)
    }

    fn get_agent(&self, agent_id: u64) -> Result<Agent> {
        self.load_agent(agent_id)
    }

    fn update_agent(&self, agent: &Agent) -> Result<Agent> {
        let stored = self.load_agent(agent.id)?;
        if stored.owner != agent.owner {
            return Err(AgentryError::RecordInvalid(format!(
                "agent {} belongs to {} and cannot be moved to {}",
                agent.id, stored.owner, agent.owner
            )));
        }
        agent.validate()?;

        let updated = Agent {
            created_at: stored.created_at,
            updated_at: self.clock.now(),
            ..agent.clone()
        };
        atomic_write_json(self.agent_path(updated.id), &updated)?;

        self.audit(
            Event::new(EventAction::AgentUpdate)
                .with_agent(updated.id)
                .with_details(json!({
                    "name": updated.name,
                    "model": updated.model,
                    "model_params": updated.model_params,
                    "max_iterations": updated.max_iterations,
                })),
        );
        Ok(updated)
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        list_records(&self.ctx.agents_dir(), AGENT_PREFIX)
    }

    fn delete_agent(&self, agent_id: u64) -> Result<()> {
        let _lock = acquire_store_lock(&self.ctx, "delete_agent")?;
        let agent = self.load_agent(agent_id)?;
        self.delete_agent_locked(&agent)?;
        Ok(())
    }

    fn create_execution(&self, new: NewExecution) -> Result<Execution> {
        let _lock = acquire_store_lock(&self.ctx, "create_execution")?;
        self.load_agent(new.agent_id)?;

        let id = self.allocate_id(&self.ctx.executions_dir(), EXECUTION_PREFIX)?;
        let exec = Execution::new(id, new, self.clock.now());
        exec.validate()?;
        atomic_write_json(self.execution_path(id), &exec)?;
        Ok(exec)
    }

    fn get_execution(&self, execution_id: u64) -> Result<Execution> {
        self.load_execution(execution_id)
    }

    fn update_execution(&self, exec: &Execution) -> Result<Execution> {
        let stored = self.load_execution(exec.id)?;
        check_execution_update(&stored, exec)?;
        exec.validate()?;

        let mut updated = exec.clone();
        updated.updated_at = self.clock.now();
        atomic_write_json(self.execution_path(updated.id), &updated)?;
        Ok(updated)
    }

    fn list_executions(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>> {
        let executions: Vec<Execution> =
            list_records(&self.ctx.executions_dir(), EXECUTION_PREFIX)?;
        Ok(executions
            .into_iter()
            .filter(|exec| filter.matches(exec))
            .collect())
    }

    fn force_fail_execution(
        &self,
        execution_id: u64,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Execution> {
        let mut exec = self.load_execution(execution_id)?;
        exec.force_failed(message.to_string(), at);
        exec.updated_at = self.clock.now();
        atomic_write_json(self.execution_path(execution_id), &exec)?;
        Ok(exec)
    }

    fn audit(&self, event: Event) {
        record_event(&self.ctx, event);
    }
}

/// Reject writes that would rewrite history.
fn check_execution_update(stored: &Execution, exec: &Execution) -> Result<()> {
    if stored.agent_id != exec.agent_id
        || stored.prompt != exec.prompt
        || stored.input_parameters() != exec.input_parameters()
        || stored.created_at != exec.created_at
    {
        return Err(AgentryError::RecordInvalid(format!(
            "execution {}: agent, prompt and input parameters are immutable",
            exec.id
        )));
    }

    let state_changed = stored.status != exec.status
        || stored.result != exec.result
        || stored.error_message != exec.error_message
        || stored.started_at != exec.started_at
        || stored.completed_at != exec.completed_at;

    if stored.status.is_terminal() && state_changed {
        return Err(AgentryError::RecordInvalid(format!(
            "execution {} is {} and cannot be modified",
            exec.id, stored.status
        )));
    }

    Ok(())
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    entries
        .map(|entry| {
            entry.map(|e| e.path()).map_err(|e| {
                AgentryError::UserError(format!(
                    "failed to read entry in '{}': {}",
                    dir.display(),
                    e
                ))
            })
        })
        .collect()
}

/// Record files end in `.json`; atomic-write leftovers start with a dot.
fn is_record_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().and_then(|e| e.to_str()) == Some("json")
        && !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
}

/// `<prefix>-<n>.json` records in `dir`, ascending by id.
fn record_files(dir: &Path, prefix: &str) -> Result<Vec<(u64, PathBuf)>> {
    let mut records: Vec<(u64, PathBuf)> = list_dir(dir)?
        .into_iter()
        .filter(|path| is_record_file(path))
        .filter_map(|path| {
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| parse_key(stem, prefix))?;
            Some((id, path))
        })
        .collect();
    records.sort_by_key(|(id, _)| *id);
    Ok(records)
}


fn list_records<T: DeserializeOwned>(dir: &Path, prefix: &str) -> Result<Vec<T>> {
    record_files(dir, prefix)?
        .into_iter()
        .map(|(_, path)| read_json(path))
        .collect()
}

fn remove_logs(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    fs::remove_dir_all(dir).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to delete backend logs '{}': {}",
            dir.display(),
            e
        ))
    })
}

fn remove_record(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to delete record '{}': {}",
            path.display(),
            e
        ))
    })
}
