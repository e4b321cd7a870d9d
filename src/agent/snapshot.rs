//! Parameter snapshots.
//!
//! A snapshot is the flat view of an agent and its owner captured when an
//! execution is created. It is stored verbatim as the execution's
//! `input_params` and never touched again, so later edits to the agent or
//! owner do not rewrite history.

use super::Agent;
use crate::owner::PromptSource;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Internal identity and timestamp keys never copied into a snapshot.
const EXCLUDED_KEYS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Build the snapshot for `agent` and `owner`. Owner fields win on collision.
pub fn build_snapshot(agent: &Agent, owner: &dyn PromptSource) -> BTreeMap<String, Value> {
    let mut snapshot = BTreeMap::new();

    snapshot.insert("name".to_string(), json!(agent.name));
    snapshot.insert("model".to_string(), json!(agent.model));
    snapshot.insert("model_params".to_string(), json!(agent.model_params));
    snapshot.insert("max_iterations".to_string(), json!(agent.max_iterations));
    snapshot.insert("owner_type".to_string(), json!(agent.owner.owner_type));
    snapshot.insert("owner_id".to_string(), json!(agent.owner.owner_id));

    for (key, value) in owner.fields() {
        if EXCLUDED_KEYS.contains(&key.as_str()) {
            continue;
        }
        snapshot.insert(key.clone(), value.clone());
    }

    snapshot
}
