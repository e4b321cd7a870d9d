//! Error types for agentry.
//!
//! Uses thiserror for derive macros. Every variant maps onto one of the
//! process exit codes in [`crate::exit_codes`].

use crate::execution::ExecutionStatus;
use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for agentry operations.
#[derive(Error, Debug)]
pub enum AgentryError {
    /// The caller supplied an unusable user message or argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record failed validation at the store boundary.
    #[error("Record invalid: {0}")]
    RecordInvalid(String),

    /// A lifecycle transition was attempted from a state that does not allow it.
    #[error("cannot {action} execution {execution_id}: status is {from}")]
    InvalidTransition {
        execution_id: u64,
        from: ExecutionStatus,
        action: &'static str,
    },

    /// No prompt template exists anywhere in the owner's type chain.
    #[error("{}", format_template_not_found(.owner_type, .checked))]
    TemplateNotFound {
        owner_type: String,
        checked: Vec<PathBuf>,
    },

    /// Template evaluation failed.
    #[error("Prompt rendering failed: {0}")]
    RenderError(String),

    /// The model backend raised or timed out.
    #[error("Model backend failed: {0}")]
    BackendError(String),

    /// Lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration, filesystem or usage problem.
    #[error("{0}")]
    UserError(String),
}

fn format_template_not_found(owner_type: &str, checked: &[PathBuf]) -> String {
    let paths = checked
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("No template found for {}. Checked: {}", owner_type, paths)
}

impl AgentryError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AgentryError::InvalidInput(_)
            | AgentryError::RecordInvalid(_)
            | AgentryError::InvalidTransition { .. } => exit_codes::VALIDATION_FAILURE,
            AgentryError::TemplateNotFound { .. } | AgentryError::RenderError(_) => {
                exit_codes::TEMPLATE_FAILURE
            }
            AgentryError::BackendError(_) => exit_codes::BACKEND_FAILURE,
            AgentryError::LockError(_) => exit_codes::LOCK_FAILURE,
            AgentryError::NotFound(_) | AgentryError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for agentry operations.
pub type Result<T> = std::result::Result<T, AgentryError>;
