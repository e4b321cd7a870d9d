//! Command implementations for agentry.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the [`Session`] every store-backed command opens.

mod agent;
mod executions;
mod init;
mod lock;
mod owner;
mod prompt;
mod run;

use crate::cli::{
    AgentAction, AgentCommand, Command, ExecutionsAction, ExecutionsCommand, LockAction,
    LockCommand, OwnerAction, OwnerCommand, PromptAction, PromptCommand,
};
use crate::config::Config;
use crate::context::{StoreContext, require_store};
use crate::error::Result;
use crate::prompt::TemplateResolver;
use crate::store::FileStore;
use serde_json::Value;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(),
        Command::Owner(cmd) => dispatch_owner(cmd),
        Command::Agent(cmd) => dispatch_agent(cmd),
        Command::Run(args) => run::cmd_run(args),
        Command::Prompt(cmd) => dispatch_prompt(cmd),
        Command::Executions(cmd) => dispatch_executions(cmd),
        Command::Lock(cmd) => dispatch_lock(cmd),
    }
}

fn dispatch_owner(cmd: OwnerCommand) -> Result<()> {
    match cmd.action {
        OwnerAction::Add(args) => owner::cmd_owner_add(args),
        OwnerAction::List => owner::cmd_owner_list(),
        OwnerAction::Show(args) => owner::cmd_owner_show(args),
        OwnerAction::Delete(args) => owner::cmd_owner_delete(args),
    }
}

fn dispatch_agent(cmd: AgentCommand) -> Result<()> {
    match cmd.action {
        AgentAction::Create(args) => agent::cmd_agent_create(args),
        AgentAction::List => agent::cmd_agent_list(),
        AgentAction::Show(args) => agent::cmd_agent_show(args),
        AgentAction::SetParam(args) => agent::cmd_agent_set_param(args),
        AgentAction::Delete(args) => agent::cmd_agent_delete(args),
    }
}

fn dispatch_prompt(cmd: PromptCommand) -> Result<()> {
    match cmd.action {
        PromptAction::Show(args) => prompt::cmd_prompt_show(args),
        PromptAction::Chain(args) => prompt::cmd_prompt_chain(args),
    }
}

fn dispatch_executions(cmd: ExecutionsCommand) -> Result<()> {
    match cmd.action {
        ExecutionsAction::List(args) => executions::cmd_executions_list(args),
        ExecutionsAction::Show(args) => executions::cmd_executions_show(args),
    }
}

fn dispatch_lock(cmd: LockCommand) -> Result<()> {
    match cmd.action {
        LockAction::List => lock::cmd_lock_list(),
        LockAction::Clear(args) => lock::cmd_lock_clear(args),
    }
}

/// An opened store: its context, its configuration and the record store.
pub(crate) struct Session {
    pub(crate) ctx: StoreContext,
    pub(crate) config: Config,
    pub(crate) store: FileStore,
}

impl Session {
    /// Open the store found from the current working directory.
    pub(crate) fn open() -> Result<Self> {
        Self::for_context(require_store()?)
    }

    pub(crate) fn for_context(ctx: StoreContext) -> Result<Self> {
        let config = Config::load_or_default(ctx.config_path())?;
        let store = FileStore::new(ctx.clone(), config.registry()?);
        Ok(Self { ctx, config, store })
    }

    pub(crate) fn resolver(&self) -> TemplateResolver {
        TemplateResolver::from_config(&self.config, &self.ctx.state_dir)
    }

    /// A second store handle over the same directory, for owners that need
    /// one by value.
    pub(crate) fn detached_store(&self) -> Result<FileStore> {
        Ok(FileStore::new(self.ctx.clone(), self.config.registry()?))
    }
}

/// Render a JSON value for terminal output: strings bare, everything else as
/// compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collapse a multi-line text to a single line of at most `limit` characters.
pub(crate) fn one_line(text: &str, limit: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut out: String = flat.chars().take(limit.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::test_support::DirGuard;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn dispatch_requires_initialized_store() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        let err = dispatch(Command::Owner(OwnerCommand {
            action: OwnerAction::List,
        }))
        .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("agentry init"));
    }

    #[test]
    fn session_uses_defaults_without_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::for_project(temp_dir.path());

        let session = Session::for_context(ctx).unwrap();
        assert_eq!(session.config.default_model, "gpt-4.1-nano");
        assert!(session.resolver().root().ends_with("prompts"));
    }

    #[test]
    fn session_rejects_broken_config() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::for_project(temp_dir.path());
        std::fs::create_dir_all(&ctx.state_dir).unwrap();
        std::fs::write(ctx.config_path(), "max_message_chars: 0\n").unwrap();

        assert!(Session::for_context(ctx).is_err());
    }

    #[test]
    fn display_value_leaves_strings_bare() {
        assert_eq!(display_value(&json!("Assistant")), "Assistant");
        assert_eq!(display_value(&json!(0.5)), "0.5");
        assert_eq!(display_value(&json!(["a", "b"])), "[\"a\",\"b\"]");
    }

    #[test]
    fn one_line_flattens_and_truncates() {
        assert_eq!(one_line("Hi\nthere   you", 80), "Hi there you");
        assert_eq!(one_line(&"a".repeat(10), 6), "aaa...");
    }
}
