//! `fleetedge policy ...`

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fleetedge::{AttributeSchema, Policy, PolicyStore};

use crate::Format;
use crate::style::{SemanticStyle, print_success, rows_table};

fn load_store(path: &Path) -> Result<PolicyStore> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut store = PolicyStore::new().with_schema(AttributeSchema::fleet());
    store
        .load_json(&json)
        .with_context(|| format!("Invalid policy file {}", path.display()))?;
    Ok(store)
}

/// Parses and type-checks every policy in `file`.
pub fn validate(file: &Path) -> Result<()> {
    let store = load_store(file)?;
    print_success(&format!(
        "{} is valid ({} policies)",
        file.display().code(),
        store.len()
    ));
    Ok(())
}

/// Prints what committing `new` over `old` would change.
pub fn diff(old: &Path, new: &Path) -> Result<()> {
    let current = load_store(old)?;
    let proposed = load_store(new)?;

    let mut unchanged = 0usize;
    for stored in proposed.list() {
        let diff = current.preview(&stored.policy)?;
        if diff.is_empty() {
            unchanged += 1;
        } else {
            print!("{diff}");
        }
    }

    for stored in current.list() {
        if proposed.get(&stored.policy.id).is_none() {
            println!("policy {} {}", stored.policy.id, "(removed)".denied());
        }
    }

    println!("{}", format!("{unchanged} policies unchanged").muted());
    Ok(())
}

/// Prints the built-in fleet policies.
pub fn list(format: Format) -> Result<()> {
    let policies = Policy::fleet_policies();
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&policies)?),
        Format::Text => {
            let rows: Vec<Vec<String>> = policies
                .iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        p.name.clone(),
                        p.effect.to_string(),
                        join(p.actions.iter()),
                        join(p.conditions.iter()),
                    ]
                })
                .collect();
            println!(
                "{}",
                rows_table(&["Id", "Name", "Effect", "Actions", "Conditions"], &rows)
            );
        }
    }
    Ok(())
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join("\n")
}

