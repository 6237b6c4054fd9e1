use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::db::{open_group_registry, InventoryConfig, InventoryLayout};
use crate::groups::GroupRegistry;
use crate::scanner::ScanOptions;

/// Convenience wrapper bundling layout, config, db path, and an open GroupRegistry.
#[derive(Debug)]
pub struct InventoryContext {
    pub layout: InventoryLayout,
    pub config: InventoryConfig,
    pub db_path: PathBuf,
    pub groups: GroupRegistry,
}

impl InventoryContext {
    /// Load config and open the group database for a given data directory.
    pub fn from_data_dir(root: impl AsRef<Path>) -> Result<Self> {
        let layout = InventoryLayout::new(root);
        let (config, db_path, groups) = open_group_registry(&layout)?;
        Ok(Self { layout, config, db_path, groups })
    }

    /// Scan options derived from the configured scan settings.
    pub fn scan_options(&self) -> ScanOptions {
        let settings = &self.config.scan;
        ScanOptions {
            timeout: settings.timeout_secs.map(std::time::Duration::from_secs),
            cancel: None,
            size_fallback: settings.size_fallback.then(|| settings.size_limits.clone()),
        }
    }
}
