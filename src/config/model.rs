//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Model identifier used when an agent does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Owner type registered out of the box.
pub(crate) const DEFAULT_OWNER_TYPE: &str = "ApplicationAgent";

/// Configuration for an agentry store.
///
/// This struct represents the contents of `.agentry/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Model settings
    // =========================================================================
    /// Model identifier used when an agent leaves `model` unset.
    #[serde(default = "default_model")]
    pub default_model: String,

    // =========================================================================
    // Prompt settings
    // =========================================================================
    /// Directory holding prompt templates, relative to the state directory
    /// unless absolute.
    #[serde(default = "default_template_dir")]
    pub template_dir: String,

    /// File extension of prompt templates (no leading dot).
    #[serde(default = "default_template_extension")]
    pub template_extension: String,

    /// Maximum length of a user message in characters.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Hold a per-agent lock for the duration of each execution.
    #[serde(default)]
    pub serialize_agent_executions: bool,

    /// Minutes after which a lock is considered stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Owner types
    // =========================================================================
    /// Registered owner types keyed by type name.
    #[serde(default = "default_owner_types")]
    pub owner_types: BTreeMap<String, OwnerTypeConfig>,

    // =========================================================================
    // Backend
    // =========================================================================
    /// Model backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Registration of a single owner type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerTypeConfig {
    /// Parent owner type; the template chain continues there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Fields that must be present and non-empty on every owner of this type.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

/// Settings for the subprocess model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Command template. Supports `{model}`, `{execution_id}` and
    /// `{request_file}` placeholders. The request JSON is also piped to stdin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Maximum time for one model call.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra environment variables for the backend process.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_seconds: default_timeout_seconds(),
            environment: HashMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            template_dir: default_template_dir(),
            template_extension: default_template_extension(),
            max_message_chars: default_max_message_chars(),
            serialize_agent_executions: false,
            lock_stale_minutes: default_lock_stale_minutes(),
            owner_types: default_owner_types(),
            backend: BackendConfig::default(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_template_dir() -> String {
    "prompts".to_string()
}

fn default_template_extension() -> String {
    "md".to_string()
}

fn default_max_message_chars() -> usize {
    10_000
}

fn default_lock_stale_minutes() -> u32 {
    120
}

fn default_timeout_seconds() -> u64 {
    600
}

pub(crate) fn default_owner_types() -> BTreeMap<String, OwnerTypeConfig> {
    let mut types = BTreeMap::new();
    types.insert(
        DEFAULT_OWNER_TYPE.to_string(),
        OwnerTypeConfig {
            parent: None,
            required_fields: vec![
                "role".to_string(),
                "goal".to_string(),
                "backstory".to_string(),
            ],
        },
    );
    types
}
