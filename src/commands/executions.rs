//! Implementation of the `agentry executions` commands.

use super::{Session, display_value, one_line};
use crate::cli::{ExecutionIdArgs, ExecutionsListArgs};
use crate::error::Result;
use crate::execution::Execution;
use crate::store::{ExecutionFilter, RecordStore};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Width of the prompt column in `executions list`.
const PROMPT_PREVIEW_CHARS: usize = 48;

pub fn cmd_executions_list(args: ExecutionsListArgs) -> Result<()> {
    let session = Session::open()?;
    let filter = ExecutionFilter {
        agent_id: args.agent,
        status: args.status,
    };
    let executions = session.store.list_executions(&filter)?;

    if executions.is_empty() {
        println!("No executions.");
        return Ok(());
    }

    println!("Executions ({}):", executions.len());
    for exec in &executions {
        println!("  {}", summary_line(exec));
    }

    Ok(())
}

pub fn cmd_executions_show(args: ExecutionIdArgs) -> Result<()> {
    let session = Session::open()?;
    let exec = session.store.get_execution(args.execution_id)?;
    print!("{}", describe_execution(&exec));
    Ok(())
}

fn summary_line(exec: &Execution) -> String {
    format!(
        "{:>5}  agent {:<4} {:<9} {}  {}",
        exec.id,
        exec.agent_id,
        exec.status.as_str(),
        exec.created_at.format("%Y-%m-%d %H:%M:%S"),
        one_line(&exec.prompt, PROMPT_PREVIEW_CHARS)
    )
}

fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn describe_execution(exec: &Execution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Execution:    {}", exec.id);
    let _ = writeln!(out, "Agent:        {}", exec.agent_id);
    let _ = writeln!(out, "Status:       {}", exec.status);
    let _ = writeln!(out, "Created:      {}", format_time(Some(exec.created_at)));
    let _ = writeln!(out, "Started:      {}", format_time(exec.started_at));
    let _ = writeln!(out, "Completed:    {}", format_time(exec.completed_at));
    if let (Some(started), Some(completed)) = (exec.started_at, exec.completed_at) {
        let millis = completed.signed_duration_since(started).num_milliseconds();
        let _ = writeln!(out, "Duration:     {} ms", millis);
    }
    let _ = writeln!(out, "Interactions: {}", exec.interaction_count);

    if !exec.metadata.is_empty() {
        let _ = writeln!(out, "Metadata:");
        for (key, value) in &exec.metadata {
            let _ = writeln!(out, "  {}: {}", key, display_value(value));
        }
    }

    let _ = writeln!(out, "Parameters:");
    for (key, value) in exec.input_parameters() {
        let _ = writeln!(out, "  {}: {}", key, display_value(value));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Prompt:");
    let _ = writeln!(out, "{}", exec.prompt);
    if let Some(result) = &exec.result {
        let _ = writeln!(out);
        let _ = writeln!(out, "Result:");
        let _ = writeln!(out, "{}", result);
    }
    if let Some(error) = &exec.error_message {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error:");
        let _ = writeln!(out, "{}", error);
    }
    out
}
