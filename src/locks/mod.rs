//! Locking subsystem for agentry.
//!
//! Two kinds of advisory lock live in `.agentry/locks/`:
//! - the store lock (`store.lock`), held while allocating record ids and
//!   checking uniqueness constraints;
//! - per-agent locks (`agent-<id>.lock`), held for the duration of an
//!   execution when `serialize_agent_executions` is enabled.
//!
//! Lock files are created with **create_new** semantics so only one process
//! can hold a given lock. Each file carries JSON metadata (holder, pid,
//! acquired_at, action) and is removed by an RAII guard on drop.

mod guard;
mod metadata;
mod operations;
mod types;


pub use guard::LockGuard;
pub use metadata::{LockMetadata, format_age};
pub use operations::{acquire_agent_lock, acquire_store_lock, clear_lock, list_locks};
pub use types::{LockInfo, LockType};
