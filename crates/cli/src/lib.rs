use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

pub mod commands;

/// Canonicalize the path if possible, falling back to the path joined onto
/// the current working directory (e.g. when it does not exist yet).
pub fn canonicalize_or_current(path: &Path) -> Result<PathBuf> {
    if path == Path::new(".") {
        return env::current_dir().context("Failed to get current directory");
    }
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) if path.is_absolute() => Ok(path.to_path_buf()),
        Err(_) => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            Ok(cwd.join(path))
        }
    }
}

/// Resolve the data directory from `--data-dir`, the environment or the
/// platform default, as an absolute path.
pub fn data_dir_or_default(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = inventory_core::db::resolve_data_dir(explicit)?;
    canonicalize_or_current(&dir)
}

/// Infer an inventory name from the machine name.
///
/// Falls back to `this-machine` when neither `COMPUTERNAME` nor `HOSTNAME` is set.
pub fn infer_inventory_name() -> String {
    infer_inventory_name_with(|name| env::var(name).ok())
}

/// [`infer_inventory_name`] with an injectable environment lookup.
pub fn infer_inventory_name_with(env: impl Fn(&str) -> Option<String>) -> String {
    ["COMPUTERNAME", "HOSTNAME"]
        .iter()
        .filter_map(|name| env(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "this-machine".to_string())
}

/// File name for a scan saved without `--out`, e.g. `scan-20240131-154500.json`.
pub fn default_scan_file_name(now: DateTime<Utc>) -> String {
    format!("scan-{}.json", now.format("%Y%m%d-%H%M%S"))
}
