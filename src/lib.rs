//! Agentry: file-backed agent execution pipeline.
//!
//! An agent belongs to an owner record. Executing it renders a system prompt
//! from the most specific template in the owner's type chain, calls a model
//! backend, and keeps a durable, auditable [`execution::Execution`] record of
//! the call whether it succeeds or fails.
//!
//! The entry point is [`pipeline::Pipeline::execute`]. Records live in a
//! [`store::RecordStore`]; the bundled [`store::FileStore`] keeps them as JSON
//! files under `.agentry/`.

pub mod agent;
pub mod backend;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod execution;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod owner;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod store;

#[cfg(test)]
mod test_support;
