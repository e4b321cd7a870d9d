//! Implementation of the `agentry agent` commands.

use super::{Session, display_value};
use crate::agent::Agent;
use crate::cli::{AgentCreateArgs, AgentIdArgs, AgentSetParamArgs};
use crate::error::Result;
use crate::execution::ExecutionStatus;
use crate::store::{ExecutionFilter, RecordStore};
use std::fmt::Write;

pub fn cmd_agent_create(args: AgentCreateArgs) -> Result<()> {
    let session = Session::open()?;
    let agent = create_agent(&session, args)?;
    println!("Created agent {} for {}", agent.id, agent.owner);
    Ok(())
}

pub fn cmd_agent_list() -> Result<()> {
    let session = Session::open()?;
    let agents = session.store.list_agents()?;

    if agents.is_empty() {
        println!("No agents.");
        return Ok(());
    }

    println!("Agents ({}):", agents.len());
    for agent in &agents {
        println!(
            "  {:>4}  {:<24} {:<32} {}",
            agent.id,
            agent.name,
            agent.owner.to_string(),
            agent.effective_model(&session.config.default_model)
        );
    }

    Ok(())
}

pub fn cmd_agent_show(args: AgentIdArgs) -> Result<()> {
    let session = Session::open()?;
    let agent = session.store.get_agent(args.agent_id)?;
    print!("{}", describe_agent(&session, &agent)?);
    Ok(())
}

pub fn cmd_agent_set_param(args: AgentSetParamArgs) -> Result<()> {
    let session = Session::open()?;
    let agent = set_param(&session, args)?;
    println!("Updated agent {}", agent.id);
    Ok(())
}

pub fn cmd_agent_delete(args: AgentIdArgs) -> Result<()> {
    let session = Session::open()?;
    session.store.delete_agent(args.agent_id)?;
    println!("Deleted agent {}", args.agent_id);
    Ok(())
}

fn create_agent(session: &Session, args: AgentCreateArgs) -> Result<Agent> {
    let mut draft = Agent::draft(args.owner);
    if let Some(name) = args.name {
        draft.name = name;
    }
    draft.model = args.model;
    draft.max_iterations = args.max_iterations;
    for (key, value) in args.params {
        draft.set_model_parameter(key, value);
    }
    session.store.create_agent(draft)
}

fn set_param(session: &Session, args: AgentSetParamArgs) -> Result<Agent> {
    let mut agent = session.store.get_agent(args.agent_id)?;
    let (key, value) = args.param;
    agent.set_model_parameter(key, value);
    session.store.update_agent(&agent)
}

fn describe_agent(session: &Session, agent: &Agent) -> Result<String> {
    let executions = session
        .store
        .list_executions(&ExecutionFilter::for_agent(agent.id))?;
    let failed = executions
        .iter()
        .filter(|e| e.status == ExecutionStatus::Failed)
        .count();

    let mut out = String::new();
    let _ = writeln!(out, "Agent:          {}", agent.id);
    let _ = writeln!(out, "Name:           {}", agent.name);
    let _ = writeln!(out, "Owner:          {}", agent.owner);
    let model = match &agent.model {
        Some(model) => model.clone(),
        None => format!("{} (default)", session.config.default_model),
    };
    let _ = writeln!(out, "Model:          {}", model);
    let _ = writeln!(out, "Max iterations: {}", agent.max_iterations);
    let _ = writeln!(out, "Created:        {}", agent.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Updated:        {}", agent.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if !agent.model_params.is_empty() {
        let _ = writeln!(out, "Parameters:");
        for (key, value) in &agent.model_params {
            let _ = writeln!(out, "  {}: {}", key, display_value(value));
        }
    }
    let _ = writeln!(out, "Executions:     {} ({} failed)", executions.len(), failed);
    Ok(out)
}
