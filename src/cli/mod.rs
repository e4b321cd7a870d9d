//! CLI argument parsing for agentry.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::execution::ExecutionStatus;
use crate::owner::OwnerRef;
use clap::{Parser, Subcommand};
use serde_json::Value;

/// Agentry: file-backed agent execution pipeline.
///
/// Owners are records that host one agent each. Running an agent renders a
/// system prompt from the owner's template chain, calls the configured model
/// backend, and keeps an execution record of every call.
#[derive(Parser, Debug)]
#[command(name = "agentry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for agentry.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize an agentry store in the current directory.
    ///
    /// Creates `.agentry/`, the default `config.yaml` and the prompt
    /// template directory.
    Init,

    /// Owner record commands.
    Owner(OwnerCommand),

    /// Agent commands.
    Agent(AgentCommand),

    /// Run an agent with a user message and print the response.
    Run(RunArgs),

    /// Prompt template commands.
    Prompt(PromptCommand),

    /// Execution record commands.
    #[command(alias = "exec")]
    Executions(ExecutionsCommand),

    /// Lock management commands.
    ///
    /// List or clear store and agent locks.
    Lock(LockCommand),
}

/// Owner subcommands.
#[derive(Parser, Debug)]
pub struct OwnerCommand {
    #[command(subcommand)]
    pub action: OwnerAction,
}

/// Available owner actions.
#[derive(Subcommand, Debug)]
pub enum OwnerAction {
    /// Create an owner record.
    Add(OwnerAddArgs),

    /// List owner records.
    List,

    /// Show one owner record.
    Show(OwnerRefArgs),

    /// Delete an owner record, its agent and the agent's executions.
    Delete(OwnerRefArgs),
}

/// Arguments for the `owner add` command.
#[derive(Parser, Debug)]
pub struct OwnerAddArgs {
    /// Registered owner type (e.g., ApplicationAgent).
    pub owner_type: String,

    /// Owner id, unique within the type.
    pub owner_id: String,

    /// Field values as key=value. Values are parsed as JSON when valid.
    #[arg(short, long = "field", value_parser = parse_key_value)]
    pub fields: Vec<(String, Value)>,
}

/// An owner given as `TYPE:ID`.
#[derive(Parser, Debug)]
pub struct OwnerRefArgs {
    /// Owner reference (e.g., ApplicationAgent:42).
    pub owner: OwnerRef,
}

/// Agent subcommands.
#[derive(Parser, Debug)]
pub struct AgentCommand {
    #[command(subcommand)]
    pub action: AgentAction,
}

/// Available agent actions.
#[derive(Subcommand, Debug)]
pub enum AgentAction {
    /// Create the agent of an owner.
    Create(AgentCreateArgs),

    /// List agents.
    List,

    /// Show one agent.
    Show(AgentIdArgs),

    /// Set a model parameter on an agent.
    SetParam(AgentSetParamArgs),

    /// Delete an agent and its executions.
    Delete(AgentIdArgs),
}

/// Arguments for the `agent create` command.
#[derive(Parser, Debug)]
pub struct AgentCreateArgs {
    /// Owner reference (e.g., ApplicationAgent:42).
    pub owner: OwnerRef,

    /// Display name. Defaults to the owner type.
    #[arg(long)]
    pub name: Option<String>,

    /// Model identifier. Defaults to the configured default model.
    #[arg(long)]
    pub model: Option<String>,

    /// Model parameters as key=value.
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, Value)>,

    /// Maximum iterations per execution.
    #[arg(long, default_value_t = crate::agent::DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,
}

/// An agent given by id.
#[derive(Parser, Debug)]
pub struct AgentIdArgs {
    /// Agent id.
    pub agent_id: u64,
}

/// Arguments for the `agent set-param` command.
#[derive(Parser, Debug)]
pub struct AgentSetParamArgs {
    /// Agent id.
    pub agent_id: u64,

    /// Parameter as key=value.
    #[arg(value_parser = parse_key_value)]
    pub param: (String, Value),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Agent id.
    pub agent_id: u64,

    /// User message.
    pub message: String,
}

/// Prompt subcommands.
#[derive(Parser, Debug)]
pub struct PromptCommand {
    #[command(subcommand)]
    pub action: PromptAction,
}

/// Available prompt actions.
#[derive(Subcommand, Debug)]
pub enum PromptAction {
    /// Render an agent's system prompt without running it.
    Show(AgentIdArgs),

    /// List the template paths checked for an agent, most specific first.
    Chain(AgentIdArgs),
}

/// Execution subcommands.
#[derive(Parser, Debug)]
pub struct ExecutionsCommand {
    #[command(subcommand)]
    pub action: ExecutionsAction,
}

/// Available execution actions.
#[derive(Subcommand, Debug)]
pub enum ExecutionsAction {
    /// List execution records.
    List(ExecutionsListArgs),

    /// Show one execution record.
    Show(ExecutionIdArgs),
}

/// Arguments for the `executions list` command.
#[derive(Parser, Debug)]
pub struct ExecutionsListArgs {
    /// Only executions of this agent.
    #[arg(long)]
    pub agent: Option<u64>,

    /// Only executions in this status (pending, running, completed, failed).
    #[arg(long)]
    pub status: Option<ExecutionStatus>,
}

/// An execution given by id.
#[derive(Parser, Debug)]
pub struct ExecutionIdArgs {
    /// Execution id.
    pub execution_id: u64,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all active locks.
    ///
    /// Shows store and agent locks with their age and owner.
    List,

    /// Clear a specific lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock name: "store" or "agent-<id>".
    pub lock_id: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Parse `key=value`, reading the value as JSON when it is valid JSON and as
/// a plain string otherwise.
pub fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["agentry", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));
    }

    #[test]
    fn parse_owner_add() {
        let cli = Cli::try_parse_from([
            "agentry",
            "owner",
            "add",
            "ApplicationAgent",
            "1",
            "--field",
            "role=Assistant",
            "-f",
            "tags=[\"a\",\"b\"]",
        ])
        .unwrap();
        let Command::Owner(OwnerCommand {
            action: OwnerAction::Add(args),
        }) = cli.command
        else {
            panic!("Expected owner add");
        };
        assert_eq!(args.owner_type, "ApplicationAgent");
        assert_eq!(args.owner_id, "1");
        assert_eq!(
            args.fields,
            vec![
                ("role".to_string(), json!("Assistant")),
                ("tags".to_string(), json!(["a", "b"])),
            ]
        );
    }

    #[test]
    fn parse_owner_show_parses_reference() {
        let cli = Cli::try_parse_from(["agentry", "owner", "show", "Sales::LeadAgent:7"]).unwrap();
        let Command::Owner(OwnerCommand {
            action: OwnerAction::Show(args),
        }) = cli.command
        else {
            panic!("Expected owner show");
        };
        assert_eq!(args.owner, OwnerRef::new("Sales::LeadAgent", "7"));
    }

    #[test]
    fn parse_owner_show_rejects_bad_reference() {
        let result = Cli::try_parse_from(["agentry", "owner", "show", "ApplicationAgent"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_agent_create_defaults() {
        let cli = Cli::try_parse_from(["agentry", "agent", "create", "ApplicationAgent:1"]).unwrap();
        let Command::Agent(AgentCommand {
            action: AgentAction::Create(args),
        }) = cli.command
        else {
            panic!("Expected agent create");
        };
        assert!(args.name.is_none());
        assert!(args.model.is_none());
        assert!(args.params.is_empty());
        assert_eq!(args.max_iterations, 5);
    }

    #[test]
    fn parse_agent_create_full() {
        let cli = Cli::try_parse_from([
            "agentry",
            "agent",
            "create",
            "ApplicationAgent:1",
            "--name",
            "Support",
            "--model",
            "claude-haiku",
            "--param",
            "temperature=0.2",
            "--max-iterations",
            "3",
        ])
        .unwrap();
        let Command::Agent(AgentCommand {
            action: AgentAction::Create(args),
        }) = cli.command
        else {
            panic!("Expected agent create");
        };
        assert_eq!(args.name.as_deref(), Some("Support"));
        assert_eq!(args.model.as_deref(), Some("claude-haiku"));
        assert_eq!(args.params, vec![("temperature".to_string(), json!(0.2))]);
        assert_eq!(args.max_iterations, 3);
    }

    #[test]
    fn parse_agent_set_param() {
        let cli =
            Cli::try_parse_from(["agentry", "agent", "set-param", "2", "stop=END"]).unwrap();
        let Command::Agent(AgentCommand {
            action: AgentAction::SetParam(args),
        }) = cli.command
        else {
            panic!("Expected agent set-param");
        };
        assert_eq!(args.agent_id, 2);
        assert_eq!(args.param, ("stop".to_string(), json!("END")));
    }

    #[test]
    fn parse_run() {
        let cli = Cli::try_parse_from(["agentry", "run", "1", "Hello there"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("Expected run");
        };
        assert_eq!(args.agent_id, 1);
        assert_eq!(args.message, "Hello there");
    }

    #[test]
    fn parse_prompt_chain() {
        let cli = Cli::try_parse_from(["agentry", "prompt", "chain", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Prompt(PromptCommand {
                action: PromptAction::Chain(AgentIdArgs { agent_id: 4 })
            })
        ));
    }

    #[test]
    fn parse_executions_list_filters() {
        let cli = Cli::try_parse_from([
            "agentry",
            "executions",
            "list",
            "--agent",
            "3",
            "--status",
            "failed",
        ])
        .unwrap();
        let Command::Executions(ExecutionsCommand {
            action: ExecutionsAction::List(args),
        }) = cli.command
        else {
            panic!("Expected executions list");
        };
        assert_eq!(args.agent, Some(3));
        assert_eq!(args.status, Some(ExecutionStatus::Failed));
    }

    #[test]
    fn parse_executions_alias() {
        let cli = Cli::try_parse_from(["agentry", "exec", "show", "12"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Executions(ExecutionsCommand {
                action: ExecutionsAction::Show(ExecutionIdArgs { execution_id: 12 })
            })
        ));
    }

    #[test]
    fn parse_executions_rejects_unknown_status() {
        let result =
            Cli::try_parse_from(["agentry", "executions", "list", "--status", "paused"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_lock_clear() {
        let cli =
            Cli::try_parse_from(["agentry", "lock", "clear", "agent-3", "--force"]).unwrap();
        let Command::Lock(LockCommand {
            action: LockAction::Clear(args),
        }) = cli.command
        else {
            panic!("Expected lock clear");
        };
        assert_eq!(args.lock_id, "agent-3");
        assert!(args.force);
    }

    #[test]
    fn key_value_parses_json_or_falls_back_to_string() {
        assert_eq!(parse_key_value("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert_eq!(parse_key_value("on=true").unwrap(), ("on".to_string(), json!(true)));
        assert_eq!(
            parse_key_value("role=Senior Assistant").unwrap(),
            ("role".to_string(), json!("Senior Assistant"))
        );
        assert_eq!(
            parse_key_value("expr=a=b").unwrap(),
            ("expr".to_string(), json!("a=b"))
        );
        assert_eq!(parse_key_value("empty=").unwrap(), ("empty".to_string(), json!("")));
    }

    #[test]
    fn key_value_requires_key_and_separator() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=3").is_err());
    }
}
