//! Store context resolution for agentry.
//!
//! Finds the `.agentry/` state directory from any working directory by walking
//! up the directory tree, and resolves the canonical paths of everything stored
//! inside it. All commands locate records through this module so that they
//! always target the same store regardless of where they are invoked from.

use crate::error::{AgentryError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the state directory.
pub const STATE_DIR_NAME: &str = ".agentry";

/// Resolved paths for an agentry store.
///
/// All paths are absolute when the context was resolved from an absolute
/// directory.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Directory containing the state directory.
    pub project_root: PathBuf,

    /// The state directory (`{project_root}/.agentry/`).
    pub state_dir: PathBuf,

    /// Lock files (`{state_dir}/locks/`).
    pub locks_dir: PathBuf,
}

impl StoreContext {
    /// Build a context for a state directory at an explicit location.
    pub fn at<P: AsRef<Path>>(state_dir: P) -> Self {
        let state_dir = state_dir.as_ref().to_path_buf();
        let project_root = state_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| state_dir.clone());
        let locks_dir = state_dir.join("locks");

        Self {
            project_root,
            state_dir,
            locks_dir,
        }
    }

    /// Context for `{dir}/.agentry`, whether or not it exists yet.
    pub fn for_project<P: AsRef<Path>>(dir: P) -> Self {
        Self::at(dir.as_ref().join(STATE_DIR_NAME))
    }

    /// Resolve the store context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            AgentryError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the store context by searching `cwd` and its ancestors for a
    /// `.agentry/` directory.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();

        for dir in cwd.ancestors() {
            let candidate = dir.join(STATE_DIR_NAME);
            if candidate.is_dir() {
                return Ok(Self::at(candidate));
            }
        }

        Err(AgentryError::UserError(format!(
            "agentry store not initialized.\n\
             No {} directory found in '{}' or any parent directory.\n\n\
             Run `agentry init` to create one.",
            STATE_DIR_NAME,
            cwd.display()
        )))
    }

    /// Check if the state directory exists.
    pub fn exists(&self) -> bool {
        self.state_dir.is_dir()
    }

    /// Path to `config.yaml`.
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    /// Directory of owner records, one subdirectory per owner type.
    pub fn owners_dir(&self) -> PathBuf {
        self.state_dir.join("owners")
    }

    /// Directory of agent records.
    pub fn agents_dir(&self) -> PathBuf {
        self.state_dir.join("agents")
    }

    /// Directory of execution records.
    pub fn executions_dir(&self) -> PathBuf {
        self.state_dir.join("executions")
    }

    /// Directory of the append-only event log.
    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }

    /// Directory of backend logs for one execution.
    pub fn execution_logs_dir(&self, execution_id: u64) -> PathBuf {
        self.state_dir
            .join("logs")
            .join(crate::store::execution_key(execution_id))
    }

    /// Highest ids ever allocated per record kind.
    pub fn id_counters_path(&self) -> PathBuf {
        self.state_dir.join("ids.json")
    }

    /// Lock serializing id allocation and uniqueness checks.
    pub fn store_lock_path(&self) -> PathBuf {
        self.locks_dir.join("store.lock")
    }

    /// Per-agent execution lock.
    pub fn agent_lock_path(&self, agent_id: u64) -> PathBuf {
        self.locks_dir.join(format!("agent-{}.lock", agent_id))
    }
}

/// Resolve the store context and require it to exist.
pub fn require_store() -> Result<StoreContext> {
    StoreContext::resolve()
}
