//! Shared fixtures for unit tests.

use crate::backend::{ChatRequest, ModelBackend};
use crate::clock::Clock;
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use crate::owner::{OwnerRef, PromptSource};
use crate::pipeline::Pipeline;
use crate::prompt::{TemplateMedium, TemplateResolver};
use crate::store::{FileStore, RecordStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A clock that only moves when told to.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        Self {
            now: Mutex::new(start),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Backend returning a fixed response and recording every request.
#[derive(Clone)]
pub(crate) struct StubBackend {
    response: String,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl StubBackend {
    pub(crate) fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ModelBackend for StubBackend {
    fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

/// Backend that always fails with the given message.
pub(crate) struct FailingBackend(pub(crate) String);

impl ModelBackend for FailingBackend {
    fn chat(&self, _request: &ChatRequest) -> Result<String> {
        Err(AgentryError::BackendError(self.0.clone()))
    }
}

/// In-memory template medium.
#[derive(Default)]
pub(crate) struct MemoryMedium {
    files: HashMap<PathBuf, String>,
}

impl MemoryMedium {
    pub(crate) fn with(mut self, path: &str, text: &str) -> Self {
        self.files.insert(PathBuf::from(path), text.to_string());
        self
    }
}

impl TemplateMedium for MemoryMedium {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AgentryError::RenderError(format!("no template at {}", path.display())))
    }
}

/// Prompt source with an explicit chain.
pub(crate) struct ChainSource {
    chain: Vec<String>,
    fields: BTreeMap<String, Value>,
}

pub(crate) fn chain_source(chain: &[&str]) -> ChainSource {
    ChainSource {
        chain: chain.iter().map(|s| s.to_string()).collect(),
        fields: BTreeMap::new(),
    }
}

impl ChainSource {
    pub(crate) fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

impl PromptSource for ChainSource {
    fn type_name(&self) -> &str {
        &self.chain[0]
    }

    fn ancestor_chain(&self) -> Vec<String> {
        self.chain.clone()
    }

    fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

/// A fresh store in a temporary directory, driven by a manual clock.
pub(crate) struct TestEnv {
    pub(crate) temp_dir: TempDir,
    pub(crate) ctx: StoreContext,
    pub(crate) config: Config,
    pub(crate) clock: Arc<ManualClock>,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub(crate) fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::for_project(temp_dir.path());
        std::fs::create_dir_all(&ctx.state_dir).unwrap();
        Self {
            temp_dir,
            ctx,
            config,
            clock: Arc::new(ManualClock::new()),
        }
    }

    pub(crate) fn store(&self) -> FileStore {
        FileStore::new(self.ctx.clone(), self.config.registry().unwrap())
            .with_clock(self.clock.clone())
    }

    /// Write a template under the configured template directory.
    pub(crate) fn write_template(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.config.template_root(&self.ctx.state_dir).join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    pub(crate) fn pipeline(&self, backend: impl ModelBackend + 'static) -> Pipeline {
        Pipeline::new(
            self.config.clone(),
            Box::new(self.store()),
            Box::new(backend),
            TemplateResolver::from_config(&self.config, &self.ctx.state_dir),
        )
        .with_clock(self.clock.clone())
        .with_agent_locks(self.ctx.clone())
    }

    /// The role/goal/backstory owner `ApplicationAgent:1` with a saved agent.
    pub(crate) fn assistant(&self) -> crate::agent::Agent {
        let store = self.store();
        let owner = OwnerRef::new("ApplicationAgent", "1");
        store
            .create_owner(
                owner.clone(),
                BTreeMap::from([
                    ("role".to_string(), json!("Assistant")),
                    ("goal".to_string(), json!("Help users")),
                    ("backstory".to_string(), json!("AI assistant")),
                ]),
            )
            .unwrap();
        store.create_agent_for_owner(&owner, 5).unwrap()
    }
}
