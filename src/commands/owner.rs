//! Implementation of the `agentry owner` commands.

use super::{Session, display_value};
use crate::cli::{OwnerAddArgs, OwnerRefArgs};
use crate::error::Result;
use crate::owner::{OwnerRecord, OwnerRef, PromptSource};
use crate::store::RecordStore;
use std::collections::BTreeMap;
use std::fmt::Write;

pub fn cmd_owner_add(args: OwnerAddArgs) -> Result<()> {
    let session = Session::open()?;
    let record = add_owner(&session, args)?;
    println!("Created owner {}", record.owner);
    Ok(())
}

pub fn cmd_owner_list() -> Result<()> {
    let session = Session::open()?;
    let owners = session.store.list_owners()?;

    if owners.is_empty() {
        println!("No owners.");
        return Ok(());
    }

    let agents = session.store.list_agents()?;
    println!("Owners ({}):", owners.len());
    for record in &owners {
        let agent = agents
            .iter()
            .find(|a| a.owner == record.owner)
            .map(|a| format!("agent {}", a.id))
            .unwrap_or_else(|| "no agent".to_string());
        println!("  {:<32} {}", record.owner.to_string(), agent);
    }

    Ok(())
}

pub fn cmd_owner_show(args: OwnerRefArgs) -> Result<()> {
    let session = Session::open()?;
    let record = session.store.get_owner(&args.owner)?;
    print!("{}", describe_owner(&record));
    Ok(())
}

pub fn cmd_owner_delete(args: OwnerRefArgs) -> Result<()> {
    let session = Session::open()?;
    session.store.delete_owner(&args.owner)?;
    println!("Deleted owner {}", args.owner);
    Ok(())
}

fn add_owner(session: &Session, args: OwnerAddArgs) -> Result<OwnerRecord> {
    let owner = OwnerRef::new(args.owner_type, args.owner_id);
    let fields: BTreeMap<_, _> = args.fields.into_iter().collect();
    session.store.create_owner(owner, fields)
}

fn describe_owner(record: &OwnerRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Owner:      {}", record.owner);
    let _ = writeln!(out, "Type chain: {}", record.ancestor_chain().join(" -> "));
    let _ = writeln!(out, "Created:    {}", record.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Updated:    {}", record.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if record.fields.is_empty() {
        let _ = writeln!(out, "Fields:     (none)");
    } else {
        let _ = writeln!(out, "Fields:");
        for (key, value) in &record.fields {
            let _ = writeln!(out, "  {}: {}", key, display_value(value));
        }
    }
    out
}
