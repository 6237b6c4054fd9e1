use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::db::{InventoryConfig, InventoryLayout};
use crate::groups::GroupRegistry;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "APP_INVENTORY_DATA_DIR";

/// Directory name used under the platform config root.
pub const APP_DIR_NAME: &str = "app-inventory";

/// Load the inventory config JSON from disk for a given layout.
pub fn load_inventory_config(layout: &InventoryLayout) -> Result<InventoryConfig> {
    let config_json = std::fs::read_to_string(&layout.config_path).with_context(|| {
        format!("Failed to read inventory config at {}", layout.config_path.display())
    })?;
    let config: InventoryConfig =
        serde_json::from_str(&config_json).context("Failed to parse inventory config JSON")?;
    Ok(config)
}

/// Write the inventory config JSON for a given layout.
pub fn write_inventory_config(layout: &InventoryLayout, config: &InventoryConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&layout.config_path, json).with_context(|| {
        format!("Failed to write inventory config: {}", layout.config_path.display())
    })
}

/// Resolve the DB path (respecting relative/absolute config) and open the group registry.
pub fn open_group_registry(
    layout: &InventoryLayout,
) -> Result<(InventoryConfig, PathBuf, GroupRegistry)> {
    let config = load_inventory_config(layout)?;
    let db_path = layout.resolve(&config.db.path);
    let registry = GroupRegistry::open(&db_path)
        .with_context(|| format!("Failed to open group database at {}", db_path.display()))?;
    Ok((config, db_path, registry))
}

/// Pick the data directory: explicit path, then `APP_INVENTORY_DATA_DIR`,
/// then the platform config root joined with `app-inventory`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_data_dir_with(explicit, |name| std::env::var_os(name).map(PathBuf::from))
}

/// [`resolve_data_dir`] with an injectable environment lookup.
pub fn resolve_data_dir_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let non_empty = |name: &str| env(name).filter(|p| !p.as_os_str().is_empty());
    if let Some(path) = non_empty(DATA_DIR_ENV) {
        return Ok(path);
    }

    let base = if cfg!(windows) {
        non_empty("LOCALAPPDATA").or_else(|| non_empty("APPDATA"))
    } else {
        non_empty("XDG_CONFIG_HOME").or_else(|| non_empty("HOME").map(|home| home.join(".config")))
    };
    base.map(|b| b.join(APP_DIR_NAME)).ok_or_else(|| {
        anyhow!("Failed to locate a data directory; pass --data-dir or set {DATA_DIR_ENV}")
    })
}
