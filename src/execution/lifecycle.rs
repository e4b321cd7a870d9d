//! Persisted lifecycle transitions.
//!
//! Each operation loads the current record, applies one transition, writes it
//! back through the store immediately, and appends an audit event. Nothing is
//! batched: an interaction increment is its own write.

use super::{Execution, NewExecution};
use crate::clock::Clock;
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::sanitize::sanitize_error_message;
use crate::store::RecordStore;
use serde_json::{Value, json};

/// The only writer of execution records after creation.
pub struct ExecutionLifecycle<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> ExecutionLifecycle<'a> {
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Create a pending execution.
    pub fn create(&self, new: NewExecution) -> Result<Execution> {
        let exec = self.store.create_execution(new)?;
        tracing::debug!(execution = exec.id, agent = exec.agent_id, "execution created");
        self.store.audit(
            Event::new(EventAction::ExecutionCreate)
                .with_agent(exec.agent_id)
                .with_execution(exec.id)
                .with_details(json!({ "prompt_chars": exec.prompt.chars().count() })),
        );
        Ok(exec)
    }

    /// pending → running. Rejects any other state.
    pub fn start(&self, execution_id: u64) -> Result<Execution> {
        let mut exec = self.store.get_execution(execution_id)?;
        exec.start(self.clock.now())?;
        let exec = self.store.update_execution(&exec)?;

        self.store.audit(
            Event::new(EventAction::ExecutionStart)
                .with_agent(exec.agent_id)
                .with_execution(exec.id),
        );
        Ok(exec)
    }

    /// running → completed.
    pub fn complete(&self, execution_id: u64, result: &str) -> Result<Execution> {
        let mut exec = self.store.get_execution(execution_id)?;
        exec.complete(result, self.clock.now())?;
        let exec = self.store.update_execution(&exec)?;

        self.store.audit(
            Event::new(EventAction::ExecutionComplete)
                .with_agent(exec.agent_id)
                .with_execution(exec.id)
                .with_details(json!({ "result_chars": result.chars().count() })),
        );
        Ok(exec)
    }

    /// pending | running → failed, with a sanitized message.
    pub fn fail(&self, execution_id: u64, message: &str) -> Result<Execution> {
        let mut exec = self.store.get_execution(execution_id)?;
        exec.fail(message, self.clock.now())?;
        let exec = self.store.update_execution(&exec)?;

        self.audit_failure(&exec, false);
        Ok(exec)
    }

    /// Count one interaction. Valid in any state.
    pub fn increment_interaction(&self, execution_id: u64) -> Result<Execution> {
        let mut exec = self.store.get_execution(execution_id)?;
        exec.record_interaction(self.clock.now());
        let exec = self.store.update_execution(&exec)?;

        self.store.audit(
            Event::new(EventAction::ExecutionInteraction)
                .with_agent(exec.agent_id)
                .with_execution(exec.id)
                .with_details(json!({ "interaction_count": exec.interaction_count })),
        );
        Ok(exec)
    }

    /// Set one metadata entry.
    pub fn annotate(&self, execution_id: u64, key: &str, value: Value) -> Result<Execution> {
        let mut exec = self.store.get_execution(execution_id)?;
        exec.metadata.insert(key.to_string(), value);
        self.store.update_execution(&exec)
    }

    /// Force the failed state onto a record, bypassing transition and record
    /// validation.
    ///
    /// Used on the pipeline's error path, where the record may be in any
    /// state. Only status, error message and completion time are written.
    pub fn force_fail(&self, execution_id: u64, message: &str) -> Result<Execution> {
        let sanitized = sanitize_error_message(message);
        let exec = self
            .store
            .force_fail_execution(execution_id, &sanitized, self.clock.now())?;

        self.audit_failure(&exec, true);
        Ok(exec)
    }

    fn audit_failure(&self, exec: &Execution, forced: bool) {
        self.store.audit(
            Event::new(EventAction::ExecutionFail)
                .with_agent(exec.agent_id)
                .with_execution(exec.id)
                .with_details(json!({
                    "error": exec.error_message,
                    "forced": forced,
                })),
        );
    }
}
