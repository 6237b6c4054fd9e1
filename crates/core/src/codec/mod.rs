//! Scan serializer: read and write scan records as CSV, JSON or YAML.
//!
//! The tabular (CSV) form has one row per entry and no scan metadata. The
//! structured forms (JSON, YAML) wrap the entries in an envelope carrying
//! `captured_at`, `origin` and the identity-rule version.
//!
//! Loading is tolerant: bad field values become absent with a
//! [`ParseWarning`], rows without a name are skipped. Only structural
//! problems (unreadable file, not CSV/JSON/YAML, no entry list) are errors.

mod fields;
pub mod structured;
pub mod tabular;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::model::{ScanOrigin, ScanRecord};
use crate::normalize::ParseWarning;

pub use structured::FORMAT_VERSION;
pub use tabular::HEADERS;

/// On-disk encodings, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFormat {
    Csv,
    Json,
    Yaml,
}

impl ScanFormat {
    /// `.csv`, `.json`, `.yaml` or `.yml` (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, CodecError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(ScanFormat::Csv),
            "json" => Ok(ScanFormat::Json),
            "yaml" | "yml" => Ok(ScanFormat::Yaml),
            _ => Err(CodecError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScanFormat::Csv => "csv",
            ScanFormat::Json => "json",
            ScanFormat::Yaml => "yaml",
        }
    }
}

/// Structural failure reading or writing a scan file.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported scan file type: {0} (expected .csv, .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed scan file: {0}")]
    Malformed(String),
}

/// A loaded record plus the non-fatal problems found while reading it.
#[derive(Debug, Clone)]
pub struct LoadedScan {
    pub record: ScanRecord,
    pub warnings: Vec<ParseWarning>,
}

/// Write `record` to `path` in the format its extension names.
pub fn save_scan(record: &ScanRecord, path: &Path) -> Result<(), CodecError> {
    let format = ScanFormat::from_path(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ScanFormat::Csv => tabular::write_tabular(record, &mut writer)?,
        ScanFormat::Json => structured::write_json(record, &mut writer)?,
        ScanFormat::Yaml => structured::write_yaml(record, &mut writer)?,
    }
    writer.flush()?;
    debug!(path = %path.display(), format = format.as_str(), entries = record.len(), "saved scan");
    Ok(())
}

/// Load a scan file as a record of the given origin.
///
/// The caller's `origin` wins over whatever a structured envelope says, so a
/// saved current scan can be reused as a reference. CSV files take
/// `captured_at` from the file's modification time.
pub fn load_scan(path: &Path, origin: ScanOrigin) -> Result<LoadedScan, CodecError> {
    let format = ScanFormat::from_path(path)?;
    let file = File::open(path)?;
    let modified =
        file.metadata()?.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
    let reader = BufReader::new(file);
    let loaded = match format {
        ScanFormat::Csv => tabular::read_tabular(reader, origin, modified)?,
        ScanFormat::Json => structured::read_json(reader, origin, modified)?,
        ScanFormat::Yaml => structured::read_yaml(reader, origin, modified)?,
    };
    debug!(
        path = %path.display(),
        format = format.as_str(),
        entries = loaded.record.len(),
        warnings = loaded.warnings.len(),
        "loaded scan"
    );
    Ok(loaded)
}

/// Load a reference scan (`load_scan` with [`ScanOrigin::Reference`]).
pub fn load_reference(path: &Path) -> Result<LoadedScan, CodecError> {
    load_scan(path, ScanOrigin::Reference)
}
