//! Filesystem utilities for agentry.
//!
//! Every record the file store persists goes through the atomic writers here.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file, atomic_write_json, read_json};
