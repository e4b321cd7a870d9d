//! Implementation of the `agentry lock` commands.

use crate::cli::LockClearArgs;
use crate::config::Config;
use crate::context::{StoreContext, require_store};
use crate::error::{AgentryError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::locks::{self, LockInfo, format_age};
use serde_json::json;

pub fn cmd_lock_list() -> Result<()> {
    let ctx = require_store()?;
    let config = Config::load_or_default(ctx.config_path())?;

    let locks = locks::list_locks(&ctx, &config)?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {} ({}):", lock.name, lock.lock_type.as_str());
        println!("    Holder:     {} (pid {})", lock.metadata.holder, lock.metadata.pid);
        println!("    Acquired:   {}", lock.metadata.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("    Age:        {}", format_age(lock.metadata.age()));
        println!("    Action:     {}", lock.metadata.action);
        if lock.is_stale {
            println!("    Status:     STALE (exceeds {} min threshold)", config.lock_stale_minutes);
        }
        println!("    Path:       {}", lock.path.display());
        println!();
    }

    let stale_count = locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock(s) are stale. Use `agentry lock clear <name> --force` to clear.",
            stale_count
        );
    }

    Ok(())
}

pub fn cmd_lock_clear(args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(AgentryError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock held by a live process lets two writers race.\n\
             Only clear locks if you are certain the lock holder has crashed.\n\n\
             To clear the lock, run:\n  agentry lock clear {} --force",
            args.lock_id
        )));
    }

    let ctx = require_store()?;
    let cleared = clear(&ctx, &args.lock_id)?;

    println!("Cleared lock: {}", cleared.name);
    println!();
    println!("Lock details:");
    println!("  Holder:     {} (pid {})", cleared.metadata.holder, cleared.metadata.pid);
    println!("  Acquired:   {}", cleared.metadata.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Age:        {}", format_age(cleared.metadata.age()));
    println!("  Action:     {}", cleared.metadata.action);
    if cleared.is_stale {
        println!("  Status:     was STALE");
    }
    println!("  Path:       {}", cleared.path.display());

    Ok(())
}

/// Remove the lock and log a `lock_clear` event.
fn clear(ctx: &StoreContext, name: &str) -> Result<LockInfo> {
    let config = Config::load_or_default(ctx.config_path())?;
    let cleared = locks::clear_lock(ctx, name, &config)?;

    let event = Event::new(EventAction::LockClear).with_details(json!({
        "lock_id": cleared.name,
        "lock_type": cleared.lock_type.as_str(),
        "age_minutes": cleared.metadata.age().num_minutes(),
        "was_stale": cleared.is_stale,
        "holder": cleared.metadata.holder,
        "original_action": cleared.metadata.action,
    }));

    // The lock is already gone; a failed log write must not report failure.
    if let Err(e) = append_event(ctx, &event) {
        eprintln!("Warning: failed to log lock_clear event: {}", e);
    }

    Ok(cleared)
}
