//! Owning entities.
//!
//! An owner is any record that can host an agent. Owners of many unrelated
//! types share one shape: a type tag, an opaque id, and an open field mapping
//! that prompt templates read from. The type tag selects the template chain
//! through the owner-type registry.

use crate::config::{OwnerTypeRegistry, is_valid_owner_type};
use crate::error::{AgentryError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static OWNER_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid owner id regex"));

/// Anything a prompt can be rendered from.
pub trait PromptSource {
    /// Concrete type name, e.g. `Sales::LeadAgent`.
    fn type_name(&self) -> &str;

    /// The concrete type followed by its ancestors, nearest first.
    fn ancestor_chain(&self) -> Vec<String>;

    /// Fields exposed to prompt templates.
    fn fields(&self) -> &BTreeMap<String, Value>;
}

/// Reference to an owner: `(owner_type, owner_id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: String,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }

    /// Check both halves against the accepted syntax.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_owner_type(&self.owner_type) {
            return Err(AgentryError::RecordInvalid(format!(
                "owner type '{}' is not a valid type name",
                self.owner_type
            )));
        }
        if !OWNER_ID_REGEX.is_match(&self.owner_id) {
            return Err(AgentryError::RecordInvalid(format!(
                "owner id '{}' must contain only letters, digits, '_' or '-'",
                self.owner_id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_type, self.owner_id)
    }
}

impl FromStr for OwnerRef {
    type Err = AgentryError;

    /// Parse `Type:ID`. Namespaced types keep their `::` separators.
    fn from_str(s: &str) -> Result<Self> {
        let (owner_type, owner_id) = s
            .rsplit_once(':')
            .filter(|(t, id)| !id.is_empty() && !t.ends_with(':'))
            .ok_or_else(|| {
                AgentryError::InvalidInput(format!(
                    "invalid owner reference '{}': expected TYPE:ID (e.g. ApplicationAgent:42)",
                    s
                ))
            })?;

        let owner = OwnerRef::new(owner_type, owner_id);
        owner
            .validate()
            .map_err(|e| AgentryError::InvalidInput(e.to_string()))?;
        Ok(owner)
    }
}

/// A persisted owning entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRecord {
    #[serde(flatten)]
    pub owner: OwnerRef,

    #[serde(default)]
    pub fields: BTreeMap<String, Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Attached from the registry when the record is loaded.
    #[serde(skip)]
    ancestors: Vec<String>,
}

impl OwnerRecord {
    pub fn new(owner: OwnerRef, fields: BTreeMap<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            fields,
            created_at: now,
            updated_at: now,
            ancestors: Vec::new(),
        }
    }

    /// Attach the ancestor chain of this record's type.
    pub fn with_ancestors(mut self, chain: Vec<String>) -> Self {
        self.ancestors = chain;
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Validate the record against the registry: the type must be registered
    /// and every required field of the type chain must hold a non-empty value.
    pub fn validate(&self, registry: &OwnerTypeRegistry) -> Result<()> {
        self.owner.validate()?;

        let required = registry
            .required_fields(&self.owner.owner_type)
            .map_err(|e| AgentryError::RecordInvalid(e.to_string()))?;

        let missing: Vec<_> = required
            .iter()
            .filter(|name| self.fields.get(name.as_str()).is_none_or(is_blank))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(AgentryError::RecordInvalid(format!(
                "{} {} must have: {}",
                self.owner.owner_type,
                self.owner.owner_id,
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

impl PromptSource for OwnerRecord {
    fn type_name(&self) -> &str {
        &self.owner.owner_type
    }

    fn ancestor_chain(&self) -> Vec<String> {
        if self.ancestors.is_empty() {
            vec![self.owner.owner_type.clone()]
        } else {
            self.ancestors.clone()
        }
    }

    fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
