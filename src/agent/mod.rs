//! Agent records.
//!
//! An agent binds exactly one owner to model settings and an iteration budget.
//! The store enforces one agent per owner; executions reference agents by id.
//!
//! `max_iterations` is carried as configuration only. Nothing in the pipeline
//! loops on it.

mod snapshot;

pub use snapshot::build_snapshot;

use crate::error::{AgentryError, Result};
use crate::owner::OwnerRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Iteration budget given to agents that do not specify one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Configuration for one execution pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Store-assigned id. Zero for an unsaved draft.
    pub id: u64,

    #[serde(flatten)]
    pub owner: OwnerRef,

    pub name: String,

    /// Model identifier; the configured default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Options passed to the model call (temperature, max_tokens, ...).
    #[serde(default)]
    pub model_params: BTreeMap<String, Value>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Agent {
    /// An unsaved agent for `owner`, named after the owner type.
    pub fn draft(owner: OwnerRef) -> Self {
        let name = owner.owner_type.clone();
        Self {
            id: 0,
            owner,
            name,
            model: None,
            model_params: BTreeMap::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Whether the store has assigned this agent an id.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn model_parameter(&self, key: &str) -> Option<&Value> {
        self.model_params.get(key)
    }

    /// Set a model parameter. The change is persisted by the next store update.
    pub fn set_model_parameter(&mut self, key: impl Into<String>, value: Value) {
        self.model_params.insert(key.into(), value);
    }

    /// The agent's model, or `default` when unset.
    pub fn effective_model<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }

    /// Validate the record at the store boundary.
    pub fn validate(&self) -> Result<()> {
        self.owner.validate()?;

        if self.name.trim().is_empty() {
            return Err(AgentryError::RecordInvalid(
                "agent name must not be blank".to_string(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(AgentryError::RecordInvalid(
                "max_iterations must be greater than 0".to_string(),
            ));
        }

        if let Some(model) = &self.model
            && model.trim().is_empty()
        {
            return Err(AgentryError::RecordInvalid(
                "model must not be blank when set".to_string(),
            ));
        }

        Ok(())
    }
}
