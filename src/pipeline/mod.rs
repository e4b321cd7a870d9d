//! The agent execution pipeline.
//!
//! [`Pipeline::execute`] validates the user message, records a pending
//! execution with a snapshot of the agent and its owner, renders the system
//! prompt, calls the model backend, and records the outcome. The caller gets
//! either the response text or the original error; the execution record is
//! the audit trail either way.
//!
//! On any failure after the record exists, the error text is sanitized and
//! force-written as the failed state before the error is returned. The raw
//! message is never persisted.


use crate::agent::{Agent, build_snapshot};
use crate::backend::{ChatRequest, ModelBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use crate::execution::{ExecutionLifecycle, NewExecution};
use crate::locks::{LockGuard, acquire_agent_lock};
use crate::owner::OwnerRecord;
use crate::prompt::{SystemPrompt, TemplateResolver, build_system_prompt};
use crate::store::RecordStore;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Orchestrates one model call per `execute`.
pub struct Pipeline {
    config: Config,
    store: Box<dyn RecordStore>,
    backend: Box<dyn ModelBackend>,
    resolver: TemplateResolver,
    clock: Arc<dyn Clock>,
    lock_ctx: Option<StoreContext>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        store: Box<dyn RecordStore>,
        backend: Box<dyn ModelBackend>,
        resolver: TemplateResolver,
    ) -> Self {
        Self {
            config,
            store,
            backend,
            resolver,
            clock: Arc::new(SystemClock),
            lock_ctx: None,
        }
    }

    /// Use `clock` for lifecycle timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Where per-agent locks live. Locks are only taken when
    /// `serialize_agent_executions` is enabled.
    pub fn with_agent_locks(mut self, ctx: StoreContext) -> Self {
        self.lock_ctx = Some(ctx);
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// Run the pipeline for `user_message` and return the model's response.
    ///
    /// Any failure after the execution record is created leaves it `failed`
    /// with a sanitized message, then returns the original error. The one
    /// exception is the interaction count: it is written after `complete`, so
    /// if that write fails the error is returned and the record stays
    /// `completed`.
    pub fn execute(&self, agent: &Agent, user_message: &str) -> Result<String> {
        self.validate_user_message(user_message)?;
        if !agent.is_persisted() {
            return Err(AgentryError::InvalidInput(
                "agent must be saved before it can execute".to_string(),
            ));
        }

        let _lock = self.acquire_agent_lock(agent)?;
        self.run(agent, user_message.trim())
    }

    /// [`execute`](Self::execute) for dynamically typed input.
    pub fn execute_value(&self, agent: &Agent, user_message: &Value) -> Result<String> {
        match user_message {
            Value::Null => Err(AgentryError::InvalidInput(
                "User message cannot be blank".to_string(),
            )),
            Value::String(message) => self.execute(agent, message),
            _ => Err(AgentryError::InvalidInput(
                "User message must be a string".to_string(),
            )),
        }
    }

    /// Check a user message without side effects.
    pub fn validate_user_message(&self, user_message: &str) -> Result<()> {
        if user_message.trim().is_empty() {
            return Err(AgentryError::InvalidInput(
                "User message cannot be blank".to_string(),
            ));
        }

        let max = self.config.max_message_chars;
        if user_message.chars().count() > max {
            return Err(AgentryError::InvalidInput(format!(
                "User message is too long (maximum is {} characters)",
                max
            )));
        }

        Ok(())
    }

    /// Render the agent's system prompt without executing anything.
    pub fn preview_prompt(&self, agent: &Agent) -> Result<SystemPrompt> {
        let owner = self.store.get_owner(&agent.owner)?;
        build_system_prompt(&self.resolver, &owner)
    }

    fn acquire_agent_lock(&self, agent: &Agent) -> Result<Option<LockGuard>> {
        match &self.lock_ctx {
            Some(ctx) if self.config.serialize_agent_executions => {
                acquire_agent_lock(ctx, agent.id, "execute").map(Some)
            }
            _ => Ok(None),
        }
    }

    fn run(&self, agent: &Agent, message: &str) -> Result<String> {
        let owner = self.store.get_owner(&agent.owner)?;
        let model = agent.effective_model(&self.config.default_model).to_string();
        let lifecycle = ExecutionLifecycle::new(self.store.as_ref(), self.clock.as_ref());

        let exec = lifecycle.create(NewExecution {
            agent_id: agent.id,
            prompt: message.to_string(),
            input_params: build_snapshot(agent, &owner),
            metadata: BTreeMap::from([("model".to_string(), json!(model))]),
        })?;

        let span = tracing::info_span!("execution", id = exec.id, agent = agent.id);
        let _entered = span.enter();

        match self.attempt(&lifecycle, agent, &owner, exec.id, &model, message) {
            Ok(response) => {
                lifecycle.increment_interaction(exec.id)?;
                tracing::info!(model = %model, "execution completed");
                Ok(response)
            }
            Err(err) => {
                match lifecycle.force_fail(exec.id, &err.to_string()) {
                    Ok(failed) => tracing::warn!(
                        error = failed.error_message.as_deref().unwrap_or_default(),
                        "execution failed"
                    ),
                    Err(write_err) => tracing::error!(
                        error = %write_err,
                        "failed to record execution failure"
                    ),
                }
                Err(err)
            }
        }
    }

    fn attempt(
        &self,
        lifecycle: &ExecutionLifecycle<'_>,
        agent: &Agent,
        owner: &OwnerRecord,
        execution_id: u64,
        model: &str,
        message: &str,
    ) -> Result<String> {
        lifecycle.start(execution_id)?;

        let prompt = build_system_prompt(&self.resolver, owner)?;
        lifecycle.annotate(
            execution_id,
            "template",
            json!(prompt.template_path.display().to_string()),
        )?;

        let response = self.backend.chat(&ChatRequest {
            execution_id,
            model: model.to_string(),
            params: agent.model_params.clone(),
            system_prompt: prompt.text,
            user_message: message.to_string(),
        })?;
        if response.trim().is_empty() {
            return Err(AgentryError::BackendError(
                "backend returned an empty response".to_string(),
            ));
        }

        lifecycle.complete(execution_id, &response)?;
        Ok(response)
    }
}
