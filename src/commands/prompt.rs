//! Implementation of the `agentry prompt` commands.

use super::Session;
use crate::cli::AgentIdArgs;
use crate::error::Result;
use crate::owner::PromptSource;
use crate::prompt::{SystemPrompt, build_system_prompt};
use crate::store::RecordStore;
use std::fmt::Write;
use std::path::PathBuf;

/// Render an agent's system prompt exactly as `run` would send it.
pub fn cmd_prompt_show(args: AgentIdArgs) -> Result<()> {
    let session = Session::open()?;
    let prompt = render_for_agent(&session, args.agent_id)?;

    println!("# Template: {}", prompt.template_path.display());
    println!();
    println!("{}", prompt.text);
    Ok(())
}

/// List every template path checked for an agent and which ones exist.
pub fn cmd_prompt_chain(args: AgentIdArgs) -> Result<()> {
    let session = Session::open()?;
    let (type_name, chain) = template_chain(&session, args.agent_id)?;
    print!("{}", describe_chain(&type_name, &chain));
    Ok(())
}

fn render_for_agent(session: &Session, agent_id: u64) -> Result<SystemPrompt> {
    let agent = session.store.get_agent(agent_id)?;
    let owner = session.store.get_owner(&agent.owner)?;
    build_system_prompt(&session.resolver(), &owner)
}

fn template_chain(session: &Session, agent_id: u64) -> Result<(String, Vec<(PathBuf, bool)>)> {
    let agent = session.store.get_agent(agent_id)?;
    let owner = session.store.get_owner(&agent.owner)?;
    let chain = session.resolver().inspect(&owner);
    Ok((owner.type_name().to_string(), chain))
}

fn describe_chain(type_name: &str, chain: &[(PathBuf, bool)]) -> String {
    let selected = chain.iter().position(|(_, exists)| *exists);

    let mut out = String::new();
    let _ = writeln!(out, "Template chain for {}:", type_name);
    for (i, (path, exists)) in chain.iter().enumerate() {
        let marker = match (selected == Some(i), exists) {
            (true, _) => "selected",
            (false, true) => "shadowed",
            (false, false) => "missing",
        };
        let _ = writeln!(out, "  {}. {:<9} {}", i + 1, marker, path.display());
    }
    if selected.is_none() {
        let _ = writeln!(out, "No template found.");
    }
    out
}
