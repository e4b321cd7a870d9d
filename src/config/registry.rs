//! Owner-type registry.
//!
//! Each registered owner type may name a parent type. The ancestor chain of a
//! type is the type itself followed by its parents, nearest first. The chain
//! never includes a universal root: it stops at the first type without a parent.

use super::model::{Config, OwnerTypeConfig};
use crate::error::{AgentryError, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Owner type names: identifiers optionally namespaced with `::`.
static OWNER_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(::[A-Za-z][A-Za-z0-9_]*)*$")
        .expect("Invalid owner type regex")
});

/// Validated owner types, built once from config and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct OwnerTypeRegistry {
    types: BTreeMap<String, OwnerTypeConfig>,
}

impl OwnerTypeRegistry {
    /// Build and validate the registry described by `config.owner_types`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_types(config.owner_types.clone())
    }

    /// Build and validate a registry from explicit type registrations.
    pub fn from_types(types: BTreeMap<String, OwnerTypeConfig>) -> Result<Self> {
        for (name, entry) in &types {
            if !is_valid_owner_type(name) {
                return Err(AgentryError::UserError(format!(
                    "config validation failed: owner type '{}' is not a valid type name",
                    name
                )));
            }

            if let Some(parent) = &entry.parent
                && !types.contains_key(parent)
            {
                return Err(AgentryError::UserError(format!(
                    "config validation failed: owner type '{}' names unregistered parent '{}'",
                    name, parent
                )));
            }
        }

        let registry = Self { types };
        for name in registry.types.keys() {
            registry.walk(name)?;
        }

        Ok(registry)
    }

    /// Register a type at init time. Replaces an existing registration.
    pub fn register(
        mut self,
        name: impl Into<String>,
        parent: Option<&str>,
        required_fields: &[&str],
    ) -> Result<Self> {
        self.types.insert(
            name.into(),
            OwnerTypeConfig {
                parent: parent.map(str::to_string),
                required_fields: required_fields.iter().map(|f| f.to_string()).collect(),
            },
        );
        Self::from_types(self.types)
    }

    /// Whether `name` is a registered owner type.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Ancestor chain of `name`, most specific first.
    pub fn ancestor_chain(&self, name: &str) -> Result<Vec<String>> {
        if !self.contains(name) {
            return Err(unregistered(name, self));
        }
        self.walk(name)
    }

    /// Required fields of `name` and of every ancestor, deduplicated.
    pub fn required_fields(&self, name: &str) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        let mut fields = Vec::new();
        for type_name in self.ancestor_chain(name)? {
            if let Some(entry) = self.types.get(&type_name) {
                for field in &entry.required_fields {
                    if seen.insert(field.clone()) {
                        fields.push(field.clone());
                    }
                }
            }
        }
        Ok(fields)
    }

    fn walk(&self, name: &str) -> Result<Vec<String>> {
        let mut chain = vec![name.to_string()];
        let mut current = name;

        while let Some(parent) = self.types.get(current).and_then(|t| t.parent.as_deref()) {
            if chain.iter().any(|seen| seen == parent) {
                return Err(AgentryError::UserError(format!(
                    "config validation failed: owner type '{}' has a cyclic parent chain ({} -> {})",
                    name,
                    chain.join(" -> "),
                    parent
                )));
            }
            chain.push(parent.to_string());
            current = parent;
        }

        Ok(chain)
    }
}

/// Check an owner type name against the accepted syntax.
pub(crate) fn is_valid_owner_type(name: &str) -> bool {
    OWNER_TYPE_REGEX.is_match(name)
}

fn unregistered(name: &str, registry: &OwnerTypeRegistry) -> AgentryError {
    let known = registry.type_names().collect::<Vec<_>>();
    AgentryError::UserError(format!(
        "owner type '{}' is not registered.\nRegistered types: {}",
        name,
        if known.is_empty() {
            "(none)".to_string()
        } else {
            known.join(", ")
        }
    ))
}
