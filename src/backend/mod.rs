//! Model backends.
//!
//! The pipeline sees a backend as a synchronous chat call: one system prompt,
//! one user message, a model identifier and an open parameter map in, response
//! text out. [`CommandBackend`] runs an external program for each call.

mod command;

pub use command::CommandBackend;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Execution the call belongs to.
    pub execution_id: u64,
    pub model: String,
    /// Model options such as temperature or max_tokens.
    pub params: BTreeMap<String, Value>,
    pub system_prompt: String,
    pub user_message: String,
}

/// A language-model chat interface.
pub trait ModelBackend {
    /// Return the response text, or fail with `BackendError`.
    fn chat(&self, request: &ChatRequest) -> Result<String>;
}
