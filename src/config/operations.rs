//! Config loading, validation, and utility operations.

use super::model::Config;
use super::registry::OwnerTypeRegistry;
use crate::error::{AgentryError, Result};
use std::path::{Path, PathBuf};

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentryError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when it is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a map.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                AgentryError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            AgentryError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `default_model` must not be blank
    /// - `template_extension` must be non-empty and have no leading dot
    /// - `max_message_chars`, `lock_stale_minutes` and `backend.timeout_seconds`
    ///   must be positive
    /// - `owner_types` must form a well-formed, acyclic registry
    pub fn validate(&self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            return Err(AgentryError::UserError(
                "config validation failed: default_model must not be empty".to_string(),
            ));
        }

        if self.template_extension.is_empty() {
            return Err(AgentryError::UserError(
                "config validation failed: template_extension must not be empty".to_string(),
            ));
        }
        if self.template_extension.starts_with('.') {
            return Err(AgentryError::UserError(format!(
                "config validation failed: template_extension must not have a leading dot (found '{}'). Use '{}' instead.",
                self.template_extension,
                self.template_extension.trim_start_matches('.')
            )));
        }

        if self.max_message_chars == 0 {
            return Err(AgentryError::UserError(
                "config validation failed: max_message_chars must be greater than 0".to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(AgentryError::UserError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if self.backend.timeout_seconds == 0 {
            return Err(AgentryError::UserError(
                "config validation failed: backend.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        OwnerTypeRegistry::from_config(self)?;

        Ok(())
    }

    /// Build the owner-type registry described by `owner_types`.
    pub fn registry(&self) -> Result<OwnerTypeRegistry> {
        OwnerTypeRegistry::from_config(self)
    }

    /// Absolute template directory for a store rooted at `state_dir`.
    pub fn template_root(&self, state_dir: &Path) -> PathBuf {
        let dir = Path::new(&self.template_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            state_dir.join(dir)
        }
    }
}
