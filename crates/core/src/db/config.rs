use serde::{Deserialize, Serialize};

use crate::scanner::SizeLimits;

/// Where the group database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the group database file (typically relative to the data dir).
    pub path: String,
}

impl DbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Scanner defaults; every field may be omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Upper bound for one live scan, in seconds. Written as `null` when
    /// unbounded; only a missing key falls back to the default.
    pub timeout_secs: Option<u64>,
    /// Estimate missing sizes by walking install folders.
    pub size_fallback: bool,
    pub size_limits: SizeLimits,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self { timeout_secs: Some(30), size_fallback: false, size_limits: SizeLimits::default() }
    }
}

/// Serializable configuration for an inventory data directory.
///
/// This lives at `config.json` in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Human-friendly name, usually the machine name.
    pub name: String,
    /// Config format version.
    pub config_version: String,
    /// Database configuration (path is typically relative to the data dir).
    pub db: DbConfig,
    #[serde(default)]
    pub scan: ScanSettings,
    /// Reference scan used by `compare` when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_reference: Option<String>,
}

impl InventoryConfig {
    /// Create a configuration using the given name and db path.
    pub fn new(name: impl Into<String>, db_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_version: "0.1.0".to_string(),
            db: DbConfig::new(db_path),
            scan: ScanSettings::default(),
            default_reference: None,
        }
    }
}
