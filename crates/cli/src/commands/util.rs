use std::path::Path;

use anyhow::{bail, Context, Result};
use inventory_core::db::{InventoryContext, InventoryLayout};
use inventory_core::{default_source_registry, identity_key, GroupRegistry, SourceRegistry};

use crate::data_dir_or_default;

/// Open the inventory at the resolved data directory, with a hint when it
/// has not been initialized.
pub fn open_context(data_dir: Option<&Path>) -> Result<InventoryContext> {
    let root = data_dir_or_default(data_dir)?;
    let layout = InventoryLayout::new(&root);
    if !layout.config_path.exists() {
        bail!(
            "No inventory found at {} (run `app-inventory init` first)",
            layout.root.display()
        );
    }
    InventoryContext::from_data_dir(&root)
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

/// Sources for a scan: the snapshot file when given, else the live views.
pub fn source_registry_for(source_file: Option<&Path>) -> Result<SourceRegistry> {
    let registry = match source_file {
        Some(path) => SourceRegistry::from_snapshot_file(path)
            .with_context(|| format!("Failed to load snapshot file: {}", path.display()))?,
        None => default_source_registry(),
    };
    if registry.is_empty() {
        bail!("No source views available on this platform; pass --source-file <snapshot>");
    }
    Ok(registry)
}

/// Identity key for a CLI argument that is either a display name or, with
/// `is_key`, already a key.
pub fn key_from_arg(name: &str, is_key: bool) -> Result<String> {
    let key = if is_key { name.trim().to_string() } else { identity_key(name) };
    if key.is_empty() {
        bail!("{name:?} does not yield an identity key");
    }
    Ok(key)
}

/// Human label for an entry's group, `-` when unassigned.
pub fn group_label(groups: &GroupRegistry, identity_key: &str) -> String {
    groups.group_for(identity_key).map(|g| g.display_name.clone()).unwrap_or_else(|| "-".into())
}
