//! Configuration model for agentry.
//!
//! This module defines the Config struct that represents `.agentry/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.
//! The owner-type registry built from `owner_types` is passed explicitly to
//! the store and pipeline rather than living in a global.

mod model;
mod operations;
mod registry;


pub use model::{BackendConfig, Config, DEFAULT_MODEL, OwnerTypeConfig};
pub(crate) use model::DEFAULT_OWNER_TYPE;
pub use registry::OwnerTypeRegistry;
pub(crate) use registry::is_valid_owner_type;
