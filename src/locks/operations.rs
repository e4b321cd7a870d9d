//! Lock acquisition, listing, and clearing operations.

use super::guard::LockGuard;
use super::metadata::{LockMetadata, format_age};
use super::types::{LockInfo, LockType};
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::{AgentryError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// The store lock is held for milliseconds; writers wait briefly for it.
const STORE_LOCK_ATTEMPTS: u32 = 50;
const STORE_LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Create `lock_path` exclusively and write `metadata` into it.
///
/// Fails with `LockError` (exit code 4) when the file already exists.
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            AgentryError::UserError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let holder = match LockMetadata::read(lock_path) {
                    Ok(meta) => format!(
                        "\nLock: {} (held {} by {}, pid {})\nAction: {}",
                        lock_path.display(),
                        format_age(meta.age()),
                        meta.holder,
                        meta.pid,
                        meta.action
                    ),
                    Err(_) => format!("\nLock: {}", lock_path.display()),
                };
                AgentryError::LockError(format!("lock is held by another process{}", holder))
            } else {
                AgentryError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let body = serde_json::to_vec_pretty(metadata).map_err(|e| {
        AgentryError::LockError(format!("failed to serialize lock metadata: {}", e))
    })?;
    if let Err(e) = file.write_all(&body).and_then(|_| file.sync_all()) {
        let _ = fs::remove_file(lock_path);
        return Err(AgentryError::LockError(format!(
            "failed to write lock metadata: {}",
            e
        )));
    }

    tracing::debug!(lock = %lock_path.display(), action = %metadata.action, "lock acquired");
    Ok(LockGuard::new(lock_path.to_path_buf()))
}

/// Acquire the store-wide lock.
///
/// Held across id allocation and uniqueness checks so two writers cannot
/// create the same record id or two agents for one owner.
///
/// Contention is retried for about a second before failing with `LockError`.
pub fn acquire_store_lock(ctx: &StoreContext, action: &str) -> Result<LockGuard> {
    let lock_path = ctx.store_lock_path();
    let mut attempt = 1;
    loop {
        match acquire_lock(&lock_path, &LockMetadata::new(action)) {
            Err(AgentryError::LockError(_))
                if attempt < STORE_LOCK_ATTEMPTS && lock_path.exists() =>
            {
                attempt += 1;
                thread::sleep(STORE_LOCK_RETRY_DELAY);
            }
            result => return result,
        }
    }
}

/// Acquire the per-agent execution lock.
pub fn acquire_agent_lock(ctx: &StoreContext, agent_id: u64, action: &str) -> Result<LockGuard> {
    acquire_lock(&ctx.agent_lock_path(agent_id), &LockMetadata::new(action))
}

/// List all active locks, sorted by name.
pub fn list_locks(ctx: &StoreContext, config: &Config) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !ctx.locks_dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            AgentryError::UserError(format!("failed to read locks directory entry: {}", e))
        })?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let Some(lock_type) = LockType::from_name(&name) else {
            continue;
        };
        let Ok(metadata) = LockMetadata::read(&path) else {
            continue;
        };

        let is_stale = metadata.is_stale(config.lock_stale_minutes);
        locks.push(LockInfo {
            path,
            name,
            lock_type,
            metadata,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(locks)
}

/// Remove a lock file by name ("store" or "agent-<id>").
///
/// The caller decides whether clearing is appropriate (e.g. `--force`).
pub fn clear_lock(ctx: &StoreContext, name: &str, config: &Config) -> Result<LockInfo> {
    let lock_type = LockType::from_name(name).ok_or_else(|| {
        AgentryError::UserError(format!(
            "invalid lock name '{}': expected 'store' or 'agent-<id>'",
            name
        ))
    })?;

    let lock_path = ctx.locks_dir.join(format!("{}.lock", name));
    if !lock_path.exists() {
        return Err(AgentryError::NotFound(format!(
            "lock '{}' at {}",
            name,
            lock_path.display()
        )));
    }

    let metadata = LockMetadata::read(&lock_path)?;
    let is_stale = metadata.is_stale(config.lock_stale_minutes);

    fs::remove_file(&lock_path).map_err(|e| {
        AgentryError::UserError(format!(
            "failed to clear lock '{}': {}",
            lock_path.display(),
            e
        ))
    })?;

    Ok(LockInfo {
        path: lock_path,
        name: name.to_string(),
        lock_type,
        metadata,
        is_stale,
    })
}
