//! Implementation of the `agentry run` command.

use super::Session;
use crate::backend::{CommandBackend, ModelBackend};
use crate::cli::RunArgs;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::store::RecordStore;

/// Execute the `agentry run` command.
///
/// Runs the pipeline once with the configured command backend and prints the
/// model's response. Failures are recorded on the execution before the error
/// is reported.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let session = Session::open()?;
    let backend = CommandBackend::from_config(&session.config, &session.ctx)?;

    let response = run_agent(&session, Box::new(backend), &args)?;
    println!("{}", response);
    Ok(())
}

fn run_agent(session: &Session, backend: Box<dyn ModelBackend>, args: &RunArgs) -> Result<String> {
    let agent = session.store.get_agent(args.agent_id)?;

    let pipeline = Pipeline::new(
        session.config.clone(),
        Box::new(session.detached_store()?),
        backend,
        session.resolver(),
    )
    .with_agent_locks(session.ctx.clone());

    pipeline.execute(&agent, &args.message)
}
