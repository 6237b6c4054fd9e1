//! Directory-size estimate for entries whose registry data has no size.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use super::ScanBudget;
use crate::model::AppEntry;

/// Bounds for one directory walk. Hitting the file or time bound makes the
/// estimate absent; folders deeper than `max_depth` are simply not visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    pub max_files: usize,
    pub max_depth: usize,
    pub max_seconds: f64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { max_files: 20_000, max_depth: 6, max_seconds: 2.0 }
    }
}

impl SizeLimits {
    pub fn max_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Total size of the regular files under `root`, or `None` when the walk
/// exceeds `limits` or `root` is not a directory.
///
/// Symlinks are not followed. A path to an `.exe` is measured by its folder.
pub fn directory_size(root: &Path, limits: &SizeLimits) -> Option<u64> {
    let root = if root.is_file() {
        let is_exe = root.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));
        if !is_exe {
            return root.metadata().ok().map(|m| m.len());
        }
        root.parent()?
    } else {
        root
    };
    if !root.is_dir() {
        return None;
    }

    let deadline = Instant::now() + limits.max_time();
    let mut files = 0usize;
    let mut total = 0u64;
    for item in WalkDir::new(root).follow_links(false).max_depth(limits.max_depth + 1) {
        if Instant::now() >= deadline {
            return None;
        }
        let Ok(item) = item else { continue };
        if !item.file_type().is_file() {
            continue;
        }
        if files >= limits.max_files {
            return None;
        }
        files += 1;
        if let Ok(meta) = item.metadata() {
            total = total.saturating_add(meta.len());
        }
    }
    Some(total)
}

/// Fill `size_bytes` for entries that lack it but have an install folder.
///
/// Returns how many entries received an estimate. Stops early when the scan
/// budget is exhausted.
pub fn fill_missing_sizes(
    entries: &mut [AppEntry],
    limits: &SizeLimits,
    budget: &ScanBudget,
) -> usize {
    let mut filled = 0;
    for entry in entries.iter_mut().filter(|e| e.size_bytes.is_none()) {
        if budget.exhausted() {
            debug!("size estimation stopped by scan budget");
            break;
        }
        let Some(location) = entry.install_location.as_deref() else { continue };
        if let Some(bytes) = directory_size(Path::new(location), limits) {
            entry.size_bytes = Some(bytes);
            filled += 1;
        }
    }
    filled
}
