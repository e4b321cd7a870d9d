//! Implementation of the `agentry init` command.
//!
//! # What `agentry init` does
//!
//! 1. Creates `.agentry/` in the current directory (or reuses the one there)
//! 2. Creates the record directories: owners/, agents/, executions/, events/, locks/
//! 3. Creates `config.yaml` with defaults (if missing)
//! 4. Creates the template directory and a starter `application_agent` template
//!    (if missing)
//! 5. Creates `.gitignore` with `locks/` and `logs/` entries
//!
//! The command is idempotent: existing files are never overwritten.

use crate::config::{Config, DEFAULT_OWNER_TYPE};
use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use crate::events::{Event, EventAction, record_event};
use crate::fs::atomic_write_file;
use crate::locks;
use crate::prompt::TemplateResolver;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Template written for the default owner type.
const STARTER_TEMPLATE: &str = "\
You are {role}.

Your goal: {goal}

Background: {backstory}
";

/// Machine-local entries kept out of version control.
const IGNORED_ENTRIES: &[&str] = &["locks/", "logs/"];

/// Execute the `agentry init` command.
pub fn cmd_init() -> Result<()> {
    let cwd = std::env::current_dir().map_err(|e| {
        AgentryError::UserError(format!("failed to get current working directory: {}", e))
    })?;
    let ctx = StoreContext::for_project(&cwd);

    let created = init_store(&ctx)?;

    println!("Initialized agentry store.");
    println!();
    println!("State directory: {}", ctx.state_dir.display());
    if created.is_empty() {
        println!("Everything was already in place.");
    } else {
        println!();
        println!("Created:");
        for path in &created {
            let shown = path.strip_prefix(&ctx.project_root).unwrap_or(path);
            println!("  {}", shown.display());
        }
    }
    println!();
    println!("Next: `agentry owner add ApplicationAgent 1 -f role=... -f goal=... -f backstory=...`");

    Ok(())
}

/// Scaffold the store at `ctx`. Returns the paths that did not exist before.
pub(crate) fn init_store(ctx: &StoreContext) -> Result<Vec<std::path::PathBuf>> {
    let mut created = Vec::new();

    create_dir(&ctx.state_dir, &mut created)?;
    create_dir(&ctx.locks_dir, &mut created)?;

    let _lock_guard = locks::acquire_store_lock(ctx, "init")?;

    for dir in [ctx.owners_dir(), ctx.agents_dir(), ctx.executions_dir(), ctx.events_dir()] {
        create_dir(&dir, &mut created)?;
    }

    let config_path = ctx.config_path();
    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        let config = Config::default();
        atomic_write_file(&config_path, &config.to_yaml()?)?;
        created.push(config_path);
        config
    };

    let resolver = TemplateResolver::from_config(&config, &ctx.state_dir);
    create_dir(resolver.root(), &mut created)?;
    if config.owner_types.contains_key(DEFAULT_OWNER_TYPE) {
        let starter = resolver.path_for_type(DEFAULT_OWNER_TYPE);
        if !starter.exists() {
            atomic_write_file(&starter, STARTER_TEMPLATE)?;
            created.push(starter);
        }
    }

    ensure_gitignore(ctx)?;

    record_event(
        ctx,
        Event::new(EventAction::Init).with_details(json!({
            "state_dir": ctx.state_dir.display().to_string(),
            "created": created.len(),
        })),
    );

    Ok(created)
}

fn create_dir(path: &Path, created: &mut Vec<std::path::PathBuf>) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })?;
    created.push(path.to_path_buf());
    Ok(())
}

/// Append any missing ignore entries to `.agentry/.gitignore`.
fn ensure_gitignore(ctx: &StoreContext) -> Result<()> {
    let gitignore_path = ctx.state_dir.join(".gitignore");
    let existing = fs::read_to_string(&gitignore_path).unwrap_or_default();

    let missing: Vec<_> = IGNORED_ENTRIES
        .iter()
        .filter(|entry| !existing.lines().any(|line| line.trim() == **entry))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    if !content.contains("# Machine-local files") {
        content.push_str("# Machine-local files (never commit)\n");
    }
    for entry in missing {
        content.push_str(entry);
        content.push('\n');
    }
    atomic_write_file(&gitignore_path, &content)
}
