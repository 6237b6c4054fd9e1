use std::path::{Path, PathBuf};

/// Logical layout of an inventory data directory.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
/// The CLI or other frontends are responsible for actually creating directories
/// and files based on this layout.
#[derive(Debug, Clone)]
pub struct InventoryLayout {
    /// Data directory root.
    pub root: PathBuf,
    /// Path to the config file (JSON).
    pub config_path: PathBuf,
    /// Path to the group database file.
    pub db_path: PathBuf,
    /// Directory for saved scans.
    pub scans_dir: PathBuf,
}

impl InventoryLayout {
    /// Compute the default layout for a data directory at `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let config_path = root.join("config.json");
        let db_path = root.join("groups.db");
        let scans_dir = root.join("scans");

        Self { root, config_path, db_path, scans_dir }
    }

    /// Compute a database path string suitable for storing in `InventoryConfig`,
    /// typically as a path relative to `root`.
    pub fn db_path_relative_string(&self) -> String {
        match self.db_path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => self.db_path.to_string_lossy().to_string(),
        }
    }

    /// Path for a scan file stored under `scans/`.
    pub fn scan_path(&self, file_name: &str) -> PathBuf {
        self.scans_dir.join(file_name)
    }

    /// Resolve a path from config: absolute as-is, relative against `root`.
    pub fn resolve(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
